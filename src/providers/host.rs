//! Windows, apps, recents and shell actions supplied by the host.
//!
//! Enumerating OS windows and installed applications happens outside the
//! core; the host hands in a loader closure per source.

use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::files::FileEntry;
use super::Provider;
use crate::error::{HopError, ResultExt};
use crate::model::{ResultItem, ResultKind, SearchMode};

pub type ItemLoader = Box<dyn FnMut() -> anyhow::Result<Vec<ResultItem>> + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostSource {
    Windows,
    Apps,
    Recents,
    Actions,
}

impl HostSource {
    pub fn name(self) -> &'static str {
        match self {
            HostSource::Windows => "windows",
            HostSource::Apps => "apps",
            HostSource::Recents => "recents",
            HostSource::Actions => "actions",
        }
    }

    pub fn serves(self, mode: SearchMode) -> bool {
        match self {
            HostSource::Windows => matches!(mode, SearchMode::Windows | SearchMode::All),
            HostSource::Apps => matches!(mode, SearchMode::Apps | SearchMode::All),
            HostSource::Recents => mode == SearchMode::All,
            HostSource::Actions => mode == SearchMode::Actions,
        }
    }

    /// Open windows change constantly and are re-read on every query.
    fn reload_every_query(self) -> bool {
        self == HostSource::Windows
    }
}

pub struct HostProvider {
    source: HostSource,
    loader: ItemLoader,
    cache: Vec<ResultItem>,
    loaded: bool,
}

impl HostProvider {
    pub fn new(source: HostSource, loader: ItemLoader) -> Self {
        HostProvider {
            source,
            loader,
            cache: Vec::new(),
            loaded: false,
        }
    }

    /// Provider over a fixed list, e.g. shell actions.
    pub fn fixed(source: HostSource, items: Vec<ResultItem>) -> Self {
        Self::new(source, Box::new(move || Ok(items.clone())))
    }

    pub fn source(&self) -> HostSource {
        self.source
    }

    fn reload(&mut self) -> anyhow::Result<()> {
        let items = (self.loader)()
            .with_context(|| format!("loading {} failed", self.source.name()))?;
        debug!(source = self.source.name(), count = items.len(), "Host items loaded");
        self.cache = items;
        self.loaded = true;
        Ok(())
    }
}

impl Provider for HostProvider {
    fn name(&self) -> &str {
        self.source.name()
    }

    fn results(&mut self, _query: &str, mode: SearchMode) -> anyhow::Result<Vec<ResultItem>> {
        if !self.source.serves(mode) {
            return Ok(Vec::new());
        }
        if self.source.reload_every_query() || !self.loaded {
            self.reload()?;
        }
        Ok(self.cache.clone())
    }

    fn refresh(&mut self) {
        let _ = self.reload().warn_on_err();
    }
}

// ============================================================================
// Snapshot file
// ============================================================================

/// One host row as stored in a snapshot file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostRow {
    #[serde(default)]
    pub id: Option<String>,
    pub primary_text: String,
    #[serde(default)]
    pub secondary_text: String,
    #[serde(default)]
    pub app_id: Option<String>,
}

impl HostRow {
    pub fn into_item(self, kind: ResultKind) -> ResultItem {
        let mut item = ResultItem::new(kind, self.primary_text, self.secondary_text);
        item.id = self.id;
        item.app_id = self.app_id;
        item
    }
}

/// Host data captured to a JSON file, used by the CLI to drive the pipeline
/// without a desktop session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostSnapshot {
    #[serde(default)]
    pub windows: Vec<HostRow>,
    #[serde(default)]
    pub apps: Vec<HostRow>,
    #[serde(default)]
    pub recents: Vec<HostRow>,
    #[serde(default)]
    pub files: Vec<FileEntry>,
    #[serde(default)]
    pub actions: Vec<HostRow>,
}

impl HostSnapshot {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| HopError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse host snapshot: {}", path.display()))
    }

    pub fn items(&self, source: HostSource) -> Vec<ResultItem> {
        let (rows, kind) = match source {
            HostSource::Windows => (&self.windows, ResultKind::Window),
            HostSource::Apps => (&self.apps, ResultKind::App),
            HostSource::Recents => (&self.recents, ResultKind::Recent),
            HostSource::Actions => (&self.actions, ResultKind::Action),
        };
        rows.iter().cloned().map(|row| row.into_item(kind)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn counting(source: HostSource, loads: Arc<AtomicUsize>) -> HostProvider {
        HostProvider::new(
            source,
            Box::new(move || {
                let n = loads.fetch_add(1, Ordering::SeqCst) + 1;
                Ok(vec![ResultItem::new(
                    ResultKind::App,
                    format!("load {}", n),
                    "",
                )])
            }),
        )
    }

    #[test]
    fn test_mode_coverage() {
        assert!(HostSource::Windows.serves(SearchMode::Windows));
        assert!(HostSource::Windows.serves(SearchMode::All));
        assert!(!HostSource::Windows.serves(SearchMode::Apps));
        assert!(HostSource::Apps.serves(SearchMode::Apps));
        assert!(HostSource::Recents.serves(SearchMode::All));
        assert!(!HostSource::Recents.serves(SearchMode::Files));
        assert!(HostSource::Actions.serves(SearchMode::Actions));
        assert!(!HostSource::Actions.serves(SearchMode::All));
    }

    #[test]
    fn test_apps_load_once_until_refresh() {
        let loads = Arc::new(AtomicUsize::new(0));
        let mut apps = counting(HostSource::Apps, loads.clone());

        apps.results("", SearchMode::All).unwrap();
        let rows = apps.results("", SearchMode::Apps).unwrap();
        assert_eq!(rows[0].primary_text, "load 1");

        apps.refresh();
        let rows = apps.results("", SearchMode::Apps).unwrap();
        assert_eq!(rows[0].primary_text, "load 2");
        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_windows_reload_every_query() {
        let loads = Arc::new(AtomicUsize::new(0));
        let mut windows = counting(HostSource::Windows, loads.clone());
        windows.results("", SearchMode::Windows).unwrap();
        windows.results("", SearchMode::All).unwrap();
        windows.results("", SearchMode::Apps).unwrap();
        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_loader_error_surfaces_to_aggregator() {
        let mut apps = HostProvider::new(
            HostSource::Apps,
            Box::new(|| -> anyhow::Result<Vec<ResultItem>> { anyhow::bail!("no app index") }),
        );
        let err = apps.results("", SearchMode::Apps).unwrap_err();
        assert!(format!("{:#}", err).contains("no app index"));
    }

    #[test]
    fn test_snapshot_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("host.json");
        fs::write(
            &path,
            r#"{
                "windows": [{"id": "window:1", "primaryText": "Inbox", "secondaryText": "Mail", "appId": "org.mail"}],
                "apps": [{"id": "firefox.desktop", "primaryText": "Firefox"}],
                "files": [{"name": "a.txt", "path": "/a.txt"}]
            }"#,
        )
        .unwrap();

        let snapshot = HostSnapshot::load(&path).unwrap();
        let windows = snapshot.items(HostSource::Windows);
        assert_eq!(windows[0].kind, ResultKind::Window);
        assert_eq!(windows[0].app_id.as_deref(), Some("org.mail"));
        assert_eq!(snapshot.items(HostSource::Apps)[0].id.as_deref(), Some("firefox.desktop"));
        assert!(snapshot.items(HostSource::Recents).is_empty());
        assert_eq!(snapshot.files.len(), 1);

        assert!(HostSnapshot::load(&dir.path().join("missing.json")).is_err());
    }
}
