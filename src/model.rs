//! Core data model shared by providers, ranking and the search session.
//!
//! [`ResultItem`] rows are built fresh per search by a provider and are never
//! persisted. Scores are computed alongside the items during ranking, never
//! stored on them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Side-effecting callback owned by the host (focus a window, launch an app,
/// open a URL). The core only invokes it from [`crate::search::SearchSession::activate`].
pub type ExecuteFn = Arc<dyn Fn() + Send + Sync>;

// ============================================================================
// Result kinds
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultKind {
    Window,
    App,
    File,
    Emoji,
    Utility,
    Action,
    Recent,
}

impl ResultKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ResultKind::Window => "window",
            ResultKind::App => "app",
            ResultKind::File => "file",
            ResultKind::Emoji => "emoji",
            ResultKind::Utility => "utility",
            ResultKind::Action => "action",
            ResultKind::Recent => "recent",
        }
    }

    /// Symbolic icon the host shows next to rows of this kind, if any.
    pub fn hint_icon_name(self) -> Option<&'static str> {
        match self {
            ResultKind::Window => Some("focus-windows-symbolic"),
            ResultKind::App => Some("application-x-executable-symbolic"),
            ResultKind::File => Some("text-x-generic-symbolic"),
            _ => None,
        }
    }
}

impl fmt::Display for ResultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Result rows
// ============================================================================

#[derive(Clone)]
pub struct ResultItem {
    pub kind: ResultKind,
    /// Stable identity (app id, `calc:<expr>`, ...). Optional for some kinds.
    pub id: Option<String>,
    pub primary_text: String,
    pub secondary_text: String,
    /// Clipboard override for the copy action
    pub copy_text: Option<String>,
    /// Tail item: rendered after all ranked rows, never scored
    pub append_to_end: bool,
    /// Owning application of a window row
    pub app_id: Option<String>,
    /// Text to score against instead of the displayed text
    pub search_text: Option<String>,
    /// Target URL of a web-search action
    pub url: Option<String>,
    pub execute: Option<ExecuteFn>,
}

impl ResultItem {
    pub fn new(
        kind: ResultKind,
        primary_text: impl Into<String>,
        secondary_text: impl Into<String>,
    ) -> Self {
        ResultItem {
            kind,
            id: None,
            primary_text: primary_text.into(),
            secondary_text: secondary_text.into(),
            copy_text: None,
            append_to_end: false,
            app_id: None,
            search_text: None,
            url: None,
            execute: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_copy_text(mut self, text: impl Into<String>) -> Self {
        self.copy_text = Some(text.into());
        self
    }

    pub fn with_app_id(mut self, app_id: impl Into<String>) -> Self {
        self.app_id = Some(app_id.into());
        self
    }

    pub fn with_search_text(mut self, text: impl Into<String>) -> Self {
        self.search_text = Some(text.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_execute(mut self, execute: ExecuteFn) -> Self {
        self.execute = Some(execute);
        self
    }

    pub fn at_end(mut self) -> Self {
        self.append_to_end = true;
        self
    }

    /// Text the fuzzy scorer sees for this row.
    pub fn haystack(&self) -> String {
        match &self.search_text {
            Some(text) => text.trim().to_string(),
            None => format!("{} {}", self.primary_text, self.secondary_text)
                .trim()
                .to_string(),
        }
    }
}

impl fmt::Debug for ResultItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultItem")
            .field("kind", &self.kind)
            .field("id", &self.id)
            .field("primary_text", &self.primary_text)
            .field("secondary_text", &self.secondary_text)
            .field("copy_text", &self.copy_text)
            .field("append_to_end", &self.append_to_end)
            .field("app_id", &self.app_id)
            .field("has_execute", &self.execute.is_some())
            .finish()
    }
}

// ============================================================================
// Modes and routes
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    #[default]
    All,
    Windows,
    Apps,
    Files,
    Emoji,
    Timezone,
    Currency,
    Calculator,
    Weather,
    Actions,
}

impl SearchMode {
    pub fn as_str(self) -> &'static str {
        match self {
            SearchMode::All => "all",
            SearchMode::Windows => "windows",
            SearchMode::Apps => "apps",
            SearchMode::Files => "files",
            SearchMode::Emoji => "emoji",
            SearchMode::Timezone => "timezone",
            SearchMode::Currency => "currency",
            SearchMode::Calculator => "calculator",
            SearchMode::Weather => "weather",
            SearchMode::Actions => "actions",
        }
    }

    /// Whether rows of `kind` are shown in this mode.
    pub fn admits(self, kind: ResultKind) -> bool {
        match self {
            SearchMode::All => true,
            SearchMode::Windows => kind == ResultKind::Window,
            SearchMode::Apps => kind == ResultKind::App,
            SearchMode::Files => kind == ResultKind::File,
            SearchMode::Emoji => kind == ResultKind::Emoji,
            SearchMode::Timezone
            | SearchMode::Currency
            | SearchMode::Calculator
            | SearchMode::Weather => kind == ResultKind::Utility,
            SearchMode::Actions => kind == ResultKind::Action,
        }
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Router output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub mode: SearchMode,
    pub query: String,
}

impl Route {
    pub fn new(mode: SearchMode, query: impl Into<String>) -> Self {
        Route {
            mode,
            query: query.into(),
        }
    }
}

// ============================================================================
// Enter action
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnterAction {
    Copy { text: String },
    Execute,
    None,
}

/// Decide what pressing Enter on `item` does.
///
/// Utility rows copy their value, emoji rows copy the glyph, anything with
/// an execute capability runs it.
pub fn resolve_enter_action(item: &ResultItem) -> EnterAction {
    match item.kind {
        ResultKind::Utility => {
            let text = explicit_copy_text(item)
                .unwrap_or(&item.primary_text)
                .trim()
                .to_string();
            if text.is_empty() {
                EnterAction::None
            } else {
                EnterAction::Copy { text }
            }
        }
        ResultKind::Emoji => {
            let text = explicit_copy_text(item)
                .map(|t| t.trim())
                .or_else(|| item.primary_text.split_whitespace().next())
                .unwrap_or("")
                .to_string();
            if text.is_empty() {
                EnterAction::None
            } else {
                EnterAction::Copy { text }
            }
        }
        _ if item.execute.is_some() => EnterAction::Execute,
        _ => EnterAction::None,
    }
}

fn explicit_copy_text(item: &ResultItem) -> Option<&str> {
    item.copy_text.as_deref().filter(|t| !t.trim().is_empty())
}
