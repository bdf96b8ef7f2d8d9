//! Ranking pipeline: score, filter, sort, dedup, truncate.
//!
//! Order is total score descending, then kind weight descending, then
//! primary text ascending. The sort is stable, so identical inputs always
//! produce identical output.
//!
//! Tail items (`append_to_end`) never go through scoring. They are split off
//! before ranking and put back by [`combine`], which reserves trailing slots
//! for them.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use crate::config::{Config, RankingWeights, ACTION_WEIGHT, DEFAULT_MAX_RESULTS, DEFAULT_MIN_FUZZY_SCORE};
use crate::fuzzy;
use crate::model::{ResultItem, ResultKind};

#[derive(Debug, Clone, PartialEq)]
pub struct RankOptions {
    pub weights: RankingWeights,
    pub max_results: usize,
    pub min_fuzzy_score: f64,
}

impl Default for RankOptions {
    fn default() -> Self {
        RankOptions {
            weights: RankingWeights::default(),
            max_results: DEFAULT_MAX_RESULTS,
            min_fuzzy_score: DEFAULT_MIN_FUZZY_SCORE,
        }
    }
}

impl RankOptions {
    pub fn from_config(config: &Config) -> Self {
        RankOptions {
            weights: config.get_weights(),
            max_results: config.get_max_results(),
            min_fuzzy_score: config.get_min_fuzzy_score(),
        }
    }

    pub fn kind_weight(&self, kind: ResultKind) -> f64 {
        match kind {
            ResultKind::Window => self.weights.window,
            ResultKind::App => self.weights.app,
            ResultKind::Recent => self.weights.recent,
            ResultKind::File => self.weights.file,
            ResultKind::Emoji => self.weights.emoji,
            ResultKind::Utility => self.weights.utility,
            ResultKind::Action => ACTION_WEIGHT,
        }
    }

    fn max_results(&self) -> usize {
        self.max_results.max(1)
    }
}

/// A ranked row with the score it was sorted by.
#[derive(Debug, Clone)]
pub struct ScoredItem {
    pub item: ResultItem,
    pub score: f64,
    pub kind_weight: f64,
}

/// Identity used for dedup. App rows collapse on display text alone, so
/// several desktop entries for one application show once.
#[derive(Debug, PartialEq, Eq, Hash)]
struct DedupKey {
    kind: ResultKind,
    primary: String,
    secondary: String,
    id: Option<String>,
}

impl DedupKey {
    fn of(item: &ResultItem) -> Self {
        DedupKey {
            kind: item.kind,
            primary: item.primary_text.to_lowercase(),
            secondary: item.secondary_text.to_lowercase(),
            id: if item.kind == ResultKind::App {
                None
            } else {
                item.id.clone()
            },
        }
    }
}

fn compare_scored(a: &ScoredItem, b: &ScoredItem) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| b.kind_weight.total_cmp(&a.kind_weight))
        .then_with(|| a.item.primary_text.cmp(&b.item.primary_text))
}

/// Rank `items` against `query`, adding `boost(index, item)` to each total.
pub fn rank_scored<F>(
    query: &str,
    items: Vec<ResultItem>,
    options: &RankOptions,
    boost: F,
) -> Vec<ScoredItem>
where
    F: Fn(usize, &ResultItem) -> f64,
{
    let query = query.trim();
    let mut scored: Vec<ScoredItem> = items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| {
            let fuzzy = if query.is_empty() {
                0.0
            } else {
                let fuzzy = fuzzy::score(query, &item.haystack());
                if fuzzy.is_nan() || fuzzy < options.min_fuzzy_score {
                    return None;
                }
                fuzzy
            };
            let kind_weight = options.kind_weight(item.kind);
            let score = fuzzy + kind_weight + boost(index, &item);
            if !score.is_finite() {
                return None;
            }
            Some(ScoredItem {
                item,
                score,
                kind_weight,
            })
        })
        .collect();

    scored.sort_by(compare_scored);

    let mut seen = HashSet::new();
    scored.retain(|entry| seen.insert(DedupKey::of(&entry.item)));
    scored.truncate(options.max_results());
    scored
}

/// Rank with boosts keyed by candidate index (alias and learning boosts).
pub fn rank(
    query: &str,
    items: Vec<ResultItem>,
    options: &RankOptions,
    boosts: &HashMap<usize, f64>,
) -> Vec<ResultItem> {
    rank_scored(query, items, options, |index, _| {
        boosts.get(&index).copied().unwrap_or(0.0)
    })
    .into_iter()
    .map(|entry| entry.item)
    .collect()
}

/// Separate tail items from rankable ones, keeping relative order in both.
pub fn split_tail(items: Vec<ResultItem>) -> (Vec<ResultItem>, Vec<ResultItem>) {
    items.into_iter().partition(|item| !item.append_to_end)
}

/// Fill `max_results` slots: ranked rows first, then up to
/// `min(max_results, tail.len())` tail rows in their original order.
pub fn combine<T>(ranked: Vec<T>, tail: Vec<T>, max_results: usize) -> Vec<T> {
    let max_results = max_results.max(1);
    let tail_slots = tail.len().min(max_results);
    let head_slots = max_results - tail_slots;

    let mut combined: Vec<T> = ranked.into_iter().take(head_slots).collect();
    combined.extend(tail.into_iter().take(tail_slots));
    combined
}

/// Merge several boost maps by summing per index.
pub fn merge_boosts<'a>(maps: impl IntoIterator<Item = &'a HashMap<usize, f64>>) -> HashMap<usize, f64> {
    let mut merged = HashMap::new();
    for map in maps {
        for (&index, &boost) in map {
            *merged.entry(index).or_insert(0.0) += boost;
        }
    }
    merged
}
