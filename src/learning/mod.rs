//! Learning store: which app the user launched for which query.
//!
//! The store is a value type. [`LearningStore::record_launch`] returns an
//! updated copy, so readers holding the previous snapshot are unaffected.
//! Persistence is a compact JSON document written atomically
//! (temp file + rename).

mod insights;

pub use insights::{insights, InsightRow, InsightSort, DEFAULT_INSIGHT_LIMIT, MAX_INSIGHT_LIMIT};

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::clock::MS_PER_DAY;
use crate::model::{ResultItem, ResultKind};

pub const STORE_VERSION: u32 = 1;
pub const MAX_QUERIES: usize = 240;
pub const MAX_APPS_PER_QUERY: usize = 24;
pub const MAX_COUNT: u32 = 100_000;
const EMPTY_STORE_JSON: &str = r#"{"version":1,"entries":{}}"#;

/// Learned boost never exceeds this
pub const MAX_LEARNING_BOOST: f64 = 85.0;
const BOOST_PER_LOG2_COUNT: f64 = 18.0;
const NEVER_USED_AGE_DAYS: f64 = 365.0;
const RECENCY_HORIZON_DAYS: f64 = 180.0;
const MIN_RECENCY_FACTOR: f64 = 0.4;

/// Launch statistics for one (query, app) pair
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearnedUse {
    pub count: u32,
    pub last_used_ms: u64,
}

impl LearnedUse {
    /// Boost for this pair at `now_ms`: log-scaled count, faded by age.
    pub fn boost_at(&self, now_ms: u64) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        let age_days = if self.last_used_ms > 0 {
            now_ms.saturating_sub(self.last_used_ms) as f64 / MS_PER_DAY as f64
        } else {
            NEVER_USED_AGE_DAYS
        };
        let recency = (1.0 - age_days / RECENCY_HORIZON_DAYS).max(MIN_RECENCY_FACTOR);
        let base = (f64::from(self.count) + 1.0).log2() * BOOST_PER_LOG2_COUNT;
        (base * recency).min(MAX_LEARNING_BOOST)
    }
}

type QueryBucket = BTreeMap<String, LearnedUse>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LearningStore {
    version: u32,
    entries: BTreeMap<String, QueryBucket>,
}

impl Default for LearningStore {
    fn default() -> Self {
        LearningStore {
            version: STORE_VERSION,
            entries: BTreeMap::new(),
        }
    }
}

fn normalize_query(query: &str) -> String {
    query.trim().to_lowercase()
}

impl LearningStore {
    /// Parse the persisted JSON. Anything malformed yields an empty store;
    /// individual malformed entries are skipped.
    pub fn parse(raw: &str) -> Self {
        if raw.trim().is_empty() {
            return Self::default();
        }

        let parsed: Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "Learning store is not valid JSON, starting empty");
                return Self::default();
            }
        };

        let Some(entries) = parsed.get("entries").and_then(Value::as_object) else {
            warn!("Learning store has no entries object, starting empty");
            return Self::default();
        };

        let mut store = Self::default();
        for (query, apps) in entries {
            let Some(apps) = apps.as_object() else {
                continue;
            };
            let bucket: QueryBucket = apps
                .iter()
                .filter_map(|(app_id, entry)| {
                    let entry = entry.as_object()?;
                    let count = entry.get("count").and_then(number_as_u64).unwrap_or(0);
                    let last_used_ms = entry.get("lastUsedMs").and_then(number_as_u64).unwrap_or(0);
                    Some((
                        app_id.clone(),
                        LearnedUse {
                            count: count.min(u64::from(MAX_COUNT)) as u32,
                            last_used_ms,
                        },
                    ))
                })
                .collect();
            store.entries.insert(query.clone(), bucket);
        }
        store
    }

    /// Compact JSON, pruned to the retention limits.
    pub fn serialize(&self) -> String {
        let mut pruned = self.clone();
        pruned.prune();
        serde_json::to_string(&pruned).unwrap_or_else(|_| EMPTY_STORE_JSON.to_string())
    }

    /// Record one launch of `app_id` for `query`. Returns the updated copy;
    /// an empty query or app id returns an unchanged copy.
    pub fn record_launch(&self, query: &str, app_id: &str, now_ms: u64) -> Self {
        let query = normalize_query(query);
        let app_id = app_id.trim();
        let mut next = self.clone();
        if query.is_empty() || app_id.is_empty() {
            return next;
        }

        let entry = next
            .entries
            .entry(query.clone())
            .or_default()
            .entry(app_id.to_string())
            .or_default();
        entry.count = entry.count.saturating_add(1).min(MAX_COUNT);
        entry.last_used_ms = now_ms;

        debug!(
            query = %query,
            app_id = app_id,
            count = entry.count,
            "Recorded app launch"
        );

        next.prune();
        next
    }

    /// Boosts for `app` rows with an id, keyed by index into `items`.
    pub fn boosts(&self, query: &str, items: &[ResultItem], now_ms: u64) -> HashMap<usize, f64> {
        let mut boosts = HashMap::new();
        let Some(bucket) = self.entries.get(&normalize_query(query)) else {
            return boosts;
        };

        for (index, item) in items.iter().enumerate() {
            if item.kind != ResultKind::App {
                continue;
            }
            let Some(learned) = item.id.as_deref().and_then(|id| bucket.get(id)) else {
                continue;
            };
            let boost = learned.boost_at(now_ms);
            if boost > 0.0 {
                boosts.insert(index, boost);
            }
        }
        boosts
    }

    pub fn get(&self, query: &str, app_id: &str) -> Option<LearnedUse> {
        self.entries
            .get(&normalize_query(query))
            .and_then(|bucket| bucket.get(app_id))
            .copied()
    }

    pub fn query_count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&str, &str, LearnedUse)> {
        self.entries.iter().flat_map(|(query, bucket)| {
            bucket
                .iter()
                .map(move |(app_id, learned)| (query.as_str(), app_id.as_str(), *learned))
        })
    }

    /// Evict least recently used queries, then least recently used apps
    /// within each remaining query.
    fn prune(&mut self) {
        if self.entries.len() > MAX_QUERIES {
            let mut by_recency: Vec<(String, u64)> = self
                .entries
                .iter()
                .map(|(query, bucket)| {
                    let last = bucket.values().map(|e| e.last_used_ms).max().unwrap_or(0);
                    (query.clone(), last)
                })
                .collect();
            by_recency.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
            for (query, _) in by_recency.into_iter().skip(MAX_QUERIES) {
                self.entries.remove(&query);
            }
        }

        for bucket in self.entries.values_mut() {
            if bucket.len() <= MAX_APPS_PER_QUERY {
                continue;
            }
            let mut apps: Vec<(String, u64)> = bucket
                .iter()
                .map(|(app_id, e)| (app_id.clone(), e.last_used_ms))
                .collect();
            apps.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
            for (app_id, _) in apps.into_iter().skip(MAX_APPS_PER_QUERY) {
                bucket.remove(&app_id);
            }
        }
    }

    /// Load from `path`. A missing file is an empty store.
    #[instrument(name = "learning_load", fields(path = %path.display()))]
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("Learning store not found, starting fresh");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read learning store: {}", path.display()))?;
        let store = Self::parse(&content);

        info!(query_count = store.query_count(), "Loaded learning store");
        Ok(store)
    }

    /// Save to `path` using atomic write (write temp + rename).
    #[instrument(name = "learning_save", skip(self), fields(path = %path.display()))]
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let json = self.serialize();
        let temp_path = path.with_extension("json.tmp");

        std::fs::write(&temp_path, &json).with_context(|| {
            format!("Failed to write temp learning store: {}", temp_path.display())
        })?;
        std::fs::rename(&temp_path, path)
            .with_context(|| format!("Failed to rename temp file to {}", path.display()))?;

        info!(
            query_count = self.query_count(),
            bytes = json.len(),
            "Saved learning store (atomic)"
        );
        Ok(())
    }
}

fn number_as_u64(value: &Value) -> Option<u64> {
    value
        .as_u64()
        .or_else(|| value.as_f64().filter(|f| f.is_finite() && *f >= 0.0).map(|f| f as u64))
}
