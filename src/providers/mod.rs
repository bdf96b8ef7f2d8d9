//! Result providers and the aggregator that fans a query out to them.
//!
//! # Architecture
//!
//! - [`Provider`] is the contract every source implements
//! - [`ProviderAggregator`] owns the registered providers and isolates
//!   failures: a provider that errors or panics loses its rows for this
//!   search, the others still contribute
//! - [`ToggledProvider`] gates a provider behind a shared feature flag
//!
//! Individual providers live in the submodules.

use std::any::Any;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::{Feature, FeatureToggles};
use crate::error::HopError;
use crate::model::{ResultItem, SearchMode};
use crate::swr_cache::UpdateCallback;

pub mod calculator;
pub mod currency;
pub mod emoji;
pub mod files;
pub mod host;
pub mod timezone;
pub mod weather;
pub mod web_search;

pub use calculator::CalculatorProvider;
pub use currency::CurrencyProvider;
pub use emoji::EmojiProvider;
pub use files::{FileEntry, FilesProvider};
pub use host::{HostProvider, HostSource};
pub use timezone::TimezoneProvider;
pub use weather::WeatherProvider;
pub use web_search::{UrlOpener, WebSearchProvider};

/// JSON-returning network call injected by the host. The core never does I/O
/// itself.
pub type JsonFetch = Arc<dyn Fn(&str) -> anyhow::Result<serde_json::Value> + Send + Sync>;

/// A source of result rows.
///
/// `results` should return quickly; slow work belongs behind a
/// [`crate::swr_cache::SwrCache`] so that a pending row can be returned
/// immediately.
pub trait Provider: Send {
    /// Short identifier used in logs (e.g. "weather").
    fn name(&self) -> &str;

    /// Rows for `query` in `mode`. Providers return an empty list for modes
    /// they do not serve.
    fn results(&mut self, query: &str, mode: SearchMode) -> anyhow::Result<Vec<ResultItem>>;

    /// Reload cached source data. Called when a search session starts.
    fn refresh(&mut self) {}

    /// Register the wake-up used when asynchronously fetched data changes.
    fn set_update_callback(&mut self, _callback: Option<UpdateCallback>) {}
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

// ============================================================================
// Aggregator
// ============================================================================

#[derive(Default)]
pub struct ProviderAggregator {
    providers: Vec<Box<dyn Provider>>,
}

impl ProviderAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, provider: Box<dyn Provider>) {
        debug!(provider = provider.name(), "Registered provider");
        self.providers.push(provider);
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name().to_string()).collect()
    }

    /// Collect rows from every provider in registration order.
    pub fn collect(&mut self, query: &str, mode: SearchMode) -> Vec<ResultItem> {
        let mut items = Vec::new();

        for provider in &mut self.providers {
            let outcome = catch_unwind(AssertUnwindSafe(|| provider.results(query, mode)))
                .unwrap_or_else(|payload| {
                    Err(HopError::Provider {
                        provider: provider.name().to_string(),
                        message: format!("panicked: {}", panic_message(payload.as_ref())),
                    }
                    .into())
                });
            match outcome {
                Ok(rows) => items.extend(rows),
                Err(e) => {
                    warn!(
                        event_type = "provider_failed",
                        provider = provider.name(),
                        mode = %mode,
                        error = %e,
                        "Provider failed, rows dropped"
                    );
                }
            }
        }

        items
    }

    pub fn refresh_all(&mut self) {
        for provider in &mut self.providers {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| provider.refresh())) {
                warn!(
                    event_type = "provider_panicked",
                    provider = provider.name(),
                    panic = %panic_message(payload.as_ref()),
                    "Provider refresh panicked"
                );
            }
        }
    }

    pub fn set_update_callback(&mut self, callback: Option<UpdateCallback>) {
        for provider in &mut self.providers {
            provider.set_update_callback(callback.clone());
        }
    }
}

// ============================================================================
// Feature gating
// ============================================================================

/// Live on/off switches, one per [`Feature`], shared with gated providers.
#[derive(Debug, Clone)]
pub struct FeatureFlags {
    flags: HashMap<Feature, Arc<AtomicBool>>,
}

impl FeatureFlags {
    pub fn from_toggles(toggles: &FeatureToggles) -> Self {
        let flags = Feature::ALL
            .iter()
            .map(|&feature| {
                (
                    feature,
                    Arc::new(AtomicBool::new(toggles.is_enabled(feature))),
                )
            })
            .collect();
        FeatureFlags { flags }
    }

    pub fn flag(&self, feature: Feature) -> Arc<AtomicBool> {
        self.flags
            .get(&feature)
            .cloned()
            .unwrap_or_else(|| Arc::new(AtomicBool::new(true)))
    }

    pub fn set(&self, feature: Feature, enabled: bool) {
        if let Some(flag) = self.flags.get(&feature) {
            flag.store(enabled, Ordering::Relaxed);
        }
    }

    pub fn is_enabled(&self, feature: Feature) -> bool {
        self.flags
            .get(&feature)
            .map_or(true, |flag| flag.load(Ordering::Relaxed))
    }

    /// Wrap `inner` so it only contributes rows while `feature` is on.
    pub fn gate(&self, feature: Feature, inner: Box<dyn Provider>) -> Box<dyn Provider> {
        Box::new(ToggledProvider::new(inner, feature, self.flag(feature)))
    }
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self::from_toggles(&FeatureToggles::default())
    }
}

/// Provider that returns nothing while its feature flag is off.
/// `refresh` and `set_update_callback` always reach the inner provider.
pub struct ToggledProvider {
    inner: Box<dyn Provider>,
    feature: Feature,
    enabled: Arc<AtomicBool>,
}

impl ToggledProvider {
    pub fn new(inner: Box<dyn Provider>, feature: Feature, enabled: Arc<AtomicBool>) -> Self {
        ToggledProvider {
            inner,
            feature,
            enabled,
        }
    }

    pub fn feature(&self) -> Feature {
        self.feature
    }
}

impl Provider for ToggledProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn results(&mut self, query: &str, mode: SearchMode) -> anyhow::Result<Vec<ResultItem>> {
        if !self.enabled.load(Ordering::Relaxed) {
            return Ok(Vec::new());
        }
        self.inner.results(query, mode)
    }

    fn refresh(&mut self) {
        self.inner.refresh();
    }

    fn set_update_callback(&mut self, callback: Option<UpdateCallback>) {
        self.inner.set_update_callback(callback);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ResultKind;
    use std::sync::atomic::AtomicUsize;

    struct StaticProvider {
        name: &'static str,
        rows: Vec<&'static str>,
        refreshes: Arc<AtomicUsize>,
    }

    impl StaticProvider {
        fn boxed(name: &'static str, rows: Vec<&'static str>) -> Box<dyn Provider> {
            Box::new(StaticProvider {
                name,
                rows,
                refreshes: Arc::new(AtomicUsize::new(0)),
            })
        }
    }

    impl Provider for StaticProvider {
        fn name(&self) -> &str {
            self.name
        }

        fn results(&mut self, _query: &str, _mode: SearchMode) -> anyhow::Result<Vec<ResultItem>> {
            Ok(self
                .rows
                .iter()
                .map(|text| ResultItem::new(ResultKind::App, *text, ""))
                .collect())
        }

        fn refresh(&mut self) {
            self.refreshes.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct FailingProvider;

    impl Provider for FailingProvider {
        fn name(&self) -> &str {
            "failing"
        }

        fn results(&mut self, _query: &str, _mode: SearchMode) -> anyhow::Result<Vec<ResultItem>> {
            anyhow::bail!("backend unavailable")
        }
    }

    struct PanickingProvider;

    impl Provider for PanickingProvider {
        fn name(&self) -> &str {
            "panicking"
        }

        fn results(&mut self, _query: &str, _mode: SearchMode) -> anyhow::Result<Vec<ResultItem>> {
            panic!("provider bug")
        }

        fn refresh(&mut self) {
            panic!("refresh bug")
        }
    }

    fn texts(items: &[ResultItem]) -> Vec<&str> {
        items.iter().map(|i| i.primary_text.as_str()).collect()
    }

    #[test]
    fn test_collect_keeps_registration_order() {
        let mut aggregator = ProviderAggregator::new();
        aggregator.register(StaticProvider::boxed("one", vec!["a", "b"]));
        aggregator.register(StaticProvider::boxed("two", vec!["c"]));

        let items = aggregator.collect("x", SearchMode::All);
        assert_eq!(texts(&items), vec!["a", "b", "c"]);
        assert_eq!(aggregator.names(), vec!["one", "two"]);
    }

    #[test]
    fn test_failing_and_panicking_providers_are_isolated() {
        let mut aggregator = ProviderAggregator::new();
        aggregator.register(Box::new(FailingProvider));
        aggregator.register(StaticProvider::boxed("ok", vec!["survivor"]));
        aggregator.register(Box::new(PanickingProvider));

        let items = aggregator.collect("x", SearchMode::All);
        assert_eq!(texts(&items), vec!["survivor"]);

        // Refresh panics are contained too
        aggregator.refresh_all();
    }

    #[test]
    fn test_toggled_provider_gates_results_but_not_refresh() {
        let refreshes = Arc::new(AtomicUsize::new(0));
        let inner = Box::new(StaticProvider {
            name: "apps",
            rows: vec!["Firefox"],
            refreshes: refreshes.clone(),
        });
        let flags = FeatureFlags::default();
        let mut gated = flags.gate(Feature::Apps, inner);

        assert_eq!(gated.results("f", SearchMode::All).unwrap().len(), 1);

        flags.set(Feature::Apps, false);
        assert!(gated.results("f", SearchMode::All).unwrap().is_empty());
        gated.refresh();
        assert_eq!(refreshes.load(Ordering::SeqCst), 1);

        flags.set(Feature::Apps, true);
        assert_eq!(gated.results("f", SearchMode::All).unwrap().len(), 1);
    }

    #[test]
    fn test_flags_follow_config_toggles() {
        let toggles = FeatureToggles {
            weather: false,
            ..FeatureToggles::default()
        };
        let flags = FeatureFlags::from_toggles(&toggles);
        assert!(!flags.is_enabled(Feature::Weather));
        assert!(flags.is_enabled(Feature::WebSearch));
    }
}
