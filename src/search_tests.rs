use super::*;
use crate::clock::ManualClock;
use crate::model::SearchMode;
use crate::providers::{CalculatorProvider, Provider, WebSearchProvider};
use crate::web_search_config::default_services;
use std::sync::atomic::AtomicUsize;
use tempfile::TempDir;

const NOW: u64 = 1_700_000_000_000;

/// Returns the same rows for every query and mode.
struct Fixed(Vec<ResultItem>);

impl Provider for Fixed {
    fn name(&self) -> &str {
        "fixed"
    }

    fn results(&mut self, _query: &str, _mode: SearchMode) -> anyhow::Result<Vec<ResultItem>> {
        Ok(self.0.clone())
    }
}

fn desktop_rows() -> Vec<ResultItem> {
    vec![
        ResultItem::new(ResultKind::App, "Firefox", "").with_id("firefox.desktop"),
        ResultItem::new(ResultKind::App, "Terminal", "").with_id("terminal.desktop"),
        ResultItem::new(ResultKind::App, "Tilix", "").with_id("tilix.desktop"),
        ResultItem::new(ResultKind::Window, "Terminal", "~/src").with_id("window:7"),
    ]
}

fn session_with(config: &Config, providers: Vec<Box<dyn Provider>>) -> SearchSession {
    let mut aggregator = ProviderAggregator::new();
    for provider in providers {
        aggregator.register(provider);
    }
    SearchSession::in_memory(config, aggregator, ManualClock::new(NOW))
}

fn titles(results: &SearchResults) -> Vec<&str> {
    results.items.iter().map(|i| i.primary_text.as_str()).collect()
}

#[test]
fn test_search_routes_filters_and_ranks() {
    let mut session = session_with(&Config::default(), vec![Box::new(Fixed(desktop_rows()))]);

    let results = session.search_now("fire");
    assert_eq!(results.route.mode, SearchMode::All);
    assert_eq!(titles(&results), vec!["Firefox"]);

    // The window prefix keeps only window rows
    let results = session.search_now("w term");
    assert_eq!(results.route, Route::new(SearchMode::Windows, "term"));
    assert_eq!(results.items.len(), 1);
    assert_eq!(results.items[0].kind, ResultKind::Window);
}

#[test]
fn test_generation_increments_per_search() {
    let mut session = session_with(&Config::default(), Vec::new());
    assert_eq!(session.current_generation(), 0);
    let first = session.search_now("a");
    let second = session.search_now("b");
    assert_eq!(first.generation, 1);
    assert_eq!(second.generation, 2);
    assert!(session.is_current(2));
}

#[test]
fn test_deferred_job_discarded_after_newer_search() {
    let config = Config {
        async_rank_threshold: Some(2),
        ..Config::default()
    };
    let mut session = session_with(&config, vec![Box::new(Fixed(desktop_rows()))]);

    let SearchOutcome::Deferred(stale) = session.search("t") else {
        panic!("expected deferred ranking");
    };
    assert_eq!(stale.candidate_count(), 4);

    let SearchOutcome::Deferred(fresh) = session.search("te") else {
        panic!("expected deferred ranking");
    };
    assert!(session.run_deferred(stale).is_none());

    let results = session.run_deferred(fresh).unwrap();
    assert_eq!(results.generation, 2);
    assert_eq!(results.items[0].kind, ResultKind::Window);
}

#[test]
fn test_small_sets_rank_immediately() {
    let mut session = session_with(&Config::default(), vec![Box::new(Fixed(desktop_rows()))]);
    assert!(matches!(session.search("t"), SearchOutcome::Ready(_)));
}

#[test]
fn test_tail_rows_survive_truncation() {
    let config = Config {
        max_results: Some(3),
        ..Config::default()
    };
    let opener: crate::providers::UrlOpener = Arc::new(|_: &str| {});
    let mut session = session_with(
        &config,
        vec![
            Box::new(Fixed(desktop_rows())),
            Box::new(WebSearchProvider::new(default_services(), 5, opener)),
        ],
    );

    let results = session.search_now("t");
    assert_eq!(results.items.len(), 3);
    assert_eq!(results.items[0].primary_text, "Terminal");
    assert_eq!(results.items[1].id.as_deref(), Some("web-search:google"));
    assert_eq!(results.items[2].id.as_deref(), Some("web-search:duckduckgo"));
}

#[test]
fn test_alias_rewrite_and_app_boost() {
    let config = Config {
        aliases_json: Some(
            r#"[
                {"alias": "ff", "type": "rewrite", "target": {"query": "firefox"}},
                {"alias": "t", "type": "app", "target": {"appId": "tilix.desktop"}}
            ]"#
            .to_string(),
        ),
        ..Config::default()
    };
    let mut session = session_with(&config, vec![Box::new(Fixed(desktop_rows()))]);
    assert_eq!(session.aliases().len(), 2);

    let results = session.search_now("ff");
    assert_eq!(titles(&results), vec!["Firefox"]);
    // Display text is untouched by the rewrite
    assert_eq!(results.route.query, "ff");

    let results = session.search_now("t");
    assert_eq!(results.items[0].id.as_deref(), Some("tilix.desktop"));

    session.set_aliases(Vec::new());
    let results = session.search_now("t");
    assert_eq!(results.items[0].kind, ResultKind::Window);
}

#[test]
fn test_activate_app_records_launch_and_boosts_next_search() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("learning.json");
    let config = Config {
        learning_store_path: Some(path.to_string_lossy().into_owned()),
        ..Config::default()
    };

    let launches = Arc::new(AtomicUsize::new(0));
    let counter = launches.clone();
    let mut rows = desktop_rows();
    rows.truncate(3);
    rows[1] = rows[1]
        .clone()
        .with_execute(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

    let mut aggregator = ProviderAggregator::new();
    aggregator.register(Box::new(Fixed(rows)));
    let mut session = SearchSession::new(&config, aggregator, ManualClock::new(NOW));

    let before = session.search_now("t");
    assert_eq!(before.items[0].primary_text, "Tilix");

    let terminal = before
        .items
        .iter()
        .find(|i| i.primary_text == "Terminal")
        .unwrap()
        .clone();
    assert_eq!(session.activate("t", &terminal), EnterAction::Execute);
    assert_eq!(launches.load(Ordering::SeqCst), 1);

    let after = session.search_now("t");
    assert_eq!(after.items[0].primary_text, "Terminal");

    let stored = LearningStore::load(&path).unwrap();
    assert_eq!(stored.get("t", "terminal.desktop").unwrap().count, 1);
    assert_eq!(stored.get("t", "terminal.desktop").unwrap().last_used_ms, NOW);
}

#[test]
fn test_activate_utility_copies_without_learning() {
    let mut session = session_with(&Config::default(), vec![Box::new(CalculatorProvider)]);
    let results = session.search_now("2+2");
    assert_eq!(results.route.mode, SearchMode::Calculator);

    let action = session.activate("2+2", &results.items[0]);
    assert_eq!(action, EnterAction::Copy { text: "4".into() });
    assert!(session.learning_store().is_empty());
}

#[test]
fn test_learning_store_snapshot_swap() {
    let session = session_with(&Config::default(), Vec::new());
    let store = LearningStore::default().record_launch("ed", "gedit.desktop", NOW);
    session.set_learning_store(store);
    assert_eq!(session.learning_store().query_count(), 1);
    assert_eq!(session.debounce(), Duration::from_millis(60));
}
