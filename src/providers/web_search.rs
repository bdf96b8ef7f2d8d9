//! "Search the web for ..." tail actions, one per enabled service.

use std::sync::Arc;

use tracing::debug;

use super::Provider;
use crate::config::WebSearchSettings;
use crate::model::{ResultItem, ResultKind, SearchMode};
use crate::web_search_config::{
    default_services, display_host, filter_enabled, parse_services, WebSearchService,
};

/// Hands a URL to the host's browser launcher.
pub type UrlOpener = Arc<dyn Fn(&str) + Send + Sync>;

pub struct WebSearchProvider {
    services: Vec<WebSearchService>,
    max_actions: usize,
    opener: UrlOpener,
}

impl WebSearchProvider {
    /// Services come from `services_json` when set (no fallback, an emptied
    /// list yields no rows), else the built-in defaults.
    pub fn from_settings(settings: &WebSearchSettings, opener: UrlOpener) -> Self {
        let services = match settings.services_json.as_deref() {
            Some(raw) => parse_services(raw, false),
            None => default_services(),
        };
        let max_actions = if settings.enabled {
            settings.max_actions
        } else {
            0
        };
        Self::new(services, max_actions, opener)
    }

    pub fn new(services: Vec<WebSearchService>, max_actions: usize, opener: UrlOpener) -> Self {
        let services = filter_enabled(services);
        debug!(services = services.len(), max_actions, "Web search services loaded");
        WebSearchProvider {
            services,
            max_actions,
            opener,
        }
    }

    fn row(&self, service: &WebSearchService, query: &str) -> ResultItem {
        let url = service.search_url(query);
        let opener = Arc::clone(&self.opener);
        let target = url.clone();

        ResultItem::new(
            ResultKind::Action,
            format!("Search {} for \"{}\"", service.name, query),
            display_host(&url),
        )
        .with_id(format!("web-search:{}", service.id))
        .with_url(url)
        .with_execute(Arc::new(move || opener(&target)))
        .at_end()
    }
}

impl Provider for WebSearchProvider {
    fn name(&self) -> &str {
        "web-search"
    }

    fn results(&mut self, query: &str, mode: SearchMode) -> anyhow::Result<Vec<ResultItem>> {
        if mode != SearchMode::All {
            return Ok(Vec::new());
        }
        let q = query.trim();
        if q.is_empty() {
            return Ok(Vec::new());
        }

        Ok(self
            .services
            .iter()
            .take(self.max_actions)
            .map(|service| self.row(service, q))
            .collect())
    }
}
