//! Search session: one logical search per debounced keystroke.
//!
//! Every [`SearchSession::search`] bumps a generation counter. Large
//! candidate sets are handed back as a [`RankJob`] so the host can run the
//! ranking on its next idle tick; a job whose generation has been overtaken
//! by a newer search is dropped instead of rendered.
//!
//! Alias rules and the learning store are read through `Arc` snapshots that
//! are swapped under a short lock. Ranking always sees the latest committed
//! write and never waits on the disk.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info, instrument};

use crate::aliases::{build_alias_context, parse_aliases_config, AliasRule};
use crate::clock::SharedClock;
use crate::config::Config;
use crate::error::ResultExt;
use crate::learning::LearningStore;
use crate::model::{resolve_enter_action, EnterAction, ResultItem, ResultKind, Route};
use crate::providers::ProviderAggregator;
use crate::ranking::{self, combine, merge_boosts, split_tail, RankOptions};
use crate::router::route;
use crate::swr_cache::UpdateCallback;

/// Final rows for one search.
#[derive(Debug, Clone)]
pub struct SearchResults {
    pub generation: u64,
    pub route: Route,
    pub items: Vec<ResultItem>,
}

/// Ranking work deferred to the host's next idle tick.
#[derive(Debug)]
pub struct RankJob {
    generation: u64,
    route: Route,
    candidates: Vec<ResultItem>,
    tail: Vec<ResultItem>,
}

impl RankJob {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn candidate_count(&self) -> usize {
        self.candidates.len()
    }
}

#[derive(Debug)]
pub enum SearchOutcome {
    Ready(SearchResults),
    Deferred(RankJob),
}

pub struct SearchSession {
    generation: AtomicU64,
    aggregator: ProviderAggregator,
    options: RankOptions,
    async_rank_threshold: usize,
    debounce: Duration,
    clock: SharedClock,
    aliases: Mutex<Arc<Vec<AliasRule>>>,
    learning: Mutex<Arc<LearningStore>>,
    learning_path: Option<PathBuf>,
}

impl SearchSession {
    /// Session over `aggregator`, loading aliases from the config and the
    /// learning store from its configured path.
    pub fn new(config: &Config, aggregator: ProviderAggregator, clock: SharedClock) -> Self {
        let path = config.get_learning_store_path();
        let store = LearningStore::load(&path).warn_on_err().unwrap_or_default();
        let mut session = Self::in_memory(config, aggregator, clock);
        session.learning = Mutex::new(Arc::new(store));
        session.learning_path = Some(path);
        session
    }

    /// Session whose learning store is never written to disk.
    pub fn in_memory(config: &Config, aggregator: ProviderAggregator, clock: SharedClock) -> Self {
        let aliases = parse_aliases_config(config.get_aliases_json());
        info!(
            providers = aggregator.len(),
            aliases = aliases.len(),
            "Search session created"
        );
        SearchSession {
            generation: AtomicU64::new(0),
            aggregator,
            options: RankOptions::from_config(config),
            async_rank_threshold: config.get_async_rank_threshold(),
            debounce: Duration::from_millis(config.get_debounce_ms()),
            clock,
            aliases: Mutex::new(Arc::new(aliases)),
            learning: Mutex::new(Arc::new(LearningStore::default())),
            learning_path: None,
        }
    }

    /// Delay the host should wait after a keystroke before searching.
    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    pub fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.current_generation() == generation
    }

    pub fn aliases(&self) -> Arc<Vec<AliasRule>> {
        Arc::clone(&self.aliases.lock())
    }

    pub fn set_aliases(&self, rules: Vec<AliasRule>) {
        *self.aliases.lock() = Arc::new(rules);
    }

    pub fn learning_store(&self) -> Arc<LearningStore> {
        Arc::clone(&self.learning.lock())
    }

    pub fn set_learning_store(&self, store: LearningStore) {
        *self.learning.lock() = Arc::new(store);
    }

    /// Called when the launcher opens.
    pub fn refresh(&mut self) {
        self.aggregator.refresh_all();
    }

    pub fn set_update_callback(&mut self, callback: Option<UpdateCallback>) {
        self.aggregator.set_update_callback(callback);
    }

    #[instrument(name = "search", skip(self), fields(generation = tracing::field::Empty))]
    pub fn search(&mut self, raw_query: &str) -> SearchOutcome {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::Span::current().record("generation", generation);

        let route = route(raw_query);
        let mut items = self.aggregator.collect(&route.query, route.mode);
        items.retain(|item| route.mode.admits(item.kind));
        let (candidates, tail) = split_tail(items);

        debug!(
            mode = %route.mode,
            candidates = candidates.len(),
            tail = tail.len(),
            "Collected candidates"
        );

        let job = RankJob {
            generation,
            route,
            candidates,
            tail,
        };
        if job.candidates.len() >= self.async_rank_threshold {
            debug!(
                candidates = job.candidates.len(),
                threshold = self.async_rank_threshold,
                "Ranking deferred"
            );
            return SearchOutcome::Deferred(job);
        }
        SearchOutcome::Ready(self.rank_job(job))
    }

    /// Run a deferred job. `None` when a newer search has started.
    pub fn run_deferred(&self, job: RankJob) -> Option<SearchResults> {
        let current = self.current_generation();
        if job.generation != current {
            debug!(
                event_type = "stale_generation",
                generation = job.generation,
                current,
                "Discarding stale ranking"
            );
            return None;
        }
        Some(self.rank_job(job))
    }

    /// Search and rank in one step, running deferred work immediately.
    pub fn search_now(&mut self, raw_query: &str) -> SearchResults {
        match self.search(raw_query) {
            SearchOutcome::Ready(results) => results,
            SearchOutcome::Deferred(job) => {
                let generation = job.generation;
                let route = job.route.clone();
                self.run_deferred(job).unwrap_or(SearchResults {
                    generation,
                    route,
                    items: Vec::new(),
                })
            }
        }
    }

    fn rank_job(&self, job: RankJob) -> SearchResults {
        let RankJob {
            generation,
            route,
            candidates,
            tail,
        } = job;

        let aliases = self.aliases();
        let learning = self.learning_store();

        let alias_context = build_alias_context(&route.query, &aliases, &candidates);
        let learned = learning.boosts(&route.query, &candidates, self.clock.now_ms());
        let boosts = merge_boosts([&alias_context.boosts, &learned]);

        let ranked = ranking::rank(&alias_context.ranking_query, candidates, &self.options, &boosts);
        let items = combine(ranked, tail, self.options.max_results);

        SearchResults {
            generation,
            route,
            items,
        }
    }

    /// Resolve and perform Enter on `item`. App launches are recorded under
    /// `query` and persisted.
    pub fn activate(&self, query: &str, item: &ResultItem) -> EnterAction {
        let action = resolve_enter_action(item);
        if action == EnterAction::Execute {
            if let Some(execute) = &item.execute {
                execute();
            }
        }

        if item.kind == ResultKind::App {
            if let Some(app_id) = item.id.as_deref() {
                self.record_launch(query, app_id);
            }
        }
        action
    }

    fn record_launch(&self, query: &str, app_id: &str) {
        let updated = {
            let mut learning = self.learning.lock();
            let next = Arc::new(learning.record_launch(query, app_id, self.clock.now_ms()));
            *learning = Arc::clone(&next);
            next
        };
        if let Some(path) = &self.learning_path {
            let _ = updated.save(path).warn_on_err();
        }
    }
}

#[cfg(test)]
#[path = "search_tests.rs"]
mod tests;
