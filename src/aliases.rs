//! Alias engine.
//!
//! Aliases are exact-match shortcuts typed as the whole query. A `rewrite`
//! alias changes the text used for scoring, `app` and `window` aliases add a
//! fixed boost to the targeted rows. Corrupt config degrades to "no aliases".

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::model::{ResultItem, ResultKind};

/// Boost added per matching `app`/`window` rule.
pub const DIRECT_ALIAS_BOOST: f64 = 180.0;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AliasRule {
    pub alias: String,
    #[serde(flatten)]
    pub target: AliasTarget,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "target", rename_all = "lowercase")]
pub enum AliasTarget {
    Rewrite {
        query: String,
    },
    App {
        #[serde(rename = "appId")]
        app_id: String,
    },
    Window {
        /// Empty when only the title is constrained
        #[serde(rename = "appId")]
        app_id: String,
        /// Lowercased; empty when only the app is constrained
        #[serde(rename = "titleContains")]
        title_contains: String,
    },
}

/// How a `window` rule with both an app id and a title fragment matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowMatchPolicy {
    /// Either constraint is enough
    #[default]
    Any,
    /// Both constraints must hold
    All,
}

/// Ranking inputs derived from the alias rules for one query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AliasContext {
    pub ranking_query: String,
    /// Extra score keyed by candidate index
    pub boosts: HashMap<usize, f64>,
}

fn normalize_token(value: &str) -> String {
    value.trim().to_lowercase()
}

fn field<'a>(value: &'a Value, key: &str) -> &'a str {
    value.get(key).and_then(Value::as_str).unwrap_or("")
}

fn parse_alias_record(raw: &Value) -> Option<AliasRule> {
    let alias = normalize_token(field(raw, "alias"));
    if alias.is_empty() || alias.chars().any(char::is_whitespace) {
        return None;
    }

    let target = raw.get("target").unwrap_or(&Value::Null);
    let target = match normalize_token(field(raw, "type")).as_str() {
        "rewrite" => {
            let query = field(target, "query").trim();
            if query.is_empty() {
                return None;
            }
            AliasTarget::Rewrite {
                query: query.to_string(),
            }
        }
        "app" => {
            let app_id = field(target, "appId").trim();
            if app_id.is_empty() {
                return None;
            }
            AliasTarget::App {
                app_id: app_id.to_string(),
            }
        }
        "window" => {
            let app_id = field(target, "appId").trim().to_string();
            let title_contains = normalize_token(field(target, "titleContains"));
            if app_id.is_empty() && title_contains.is_empty() {
                return None;
            }
            AliasTarget::Window {
                app_id,
                title_contains,
            }
        }
        _ => return None,
    };

    Some(AliasRule { alias, target })
}

/// Parse the persisted alias JSON. Invalid rules are dropped; malformed JSON
/// or a non-array yields no rules.
pub fn parse_aliases_config(raw: &str) -> Vec<AliasRule> {
    if raw.trim().is_empty() {
        return Vec::new();
    }

    let parsed: Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, "Alias config is not valid JSON, ignoring");
            return Vec::new();
        }
    };

    let Some(records) = parsed.as_array() else {
        warn!("Alias config is not an array, ignoring");
        return Vec::new();
    };

    let rules: Vec<AliasRule> = records.iter().filter_map(parse_alias_record).collect();
    if rules.len() != records.len() {
        debug!(
            kept = rules.len(),
            dropped = records.len() - rules.len(),
            "Dropped invalid alias rules"
        );
    }
    rules
}

/// Serialize rules back to the persisted JSON form.
pub fn serialize_aliases(rules: &[AliasRule]) -> String {
    serde_json::to_string(rules).unwrap_or_else(|_| "[]".to_string())
}

fn window_matches(
    item: &ResultItem,
    app_id: &str,
    title_contains: &str,
    policy: WindowMatchPolicy,
) -> bool {
    if item.kind != ResultKind::Window {
        return false;
    }

    let app_hit = !app_id.is_empty() && item.app_id.as_deref() == Some(app_id);
    let title_hit =
        !title_contains.is_empty() && item.primary_text.to_lowercase().contains(title_contains);

    match policy {
        WindowMatchPolicy::Any => app_hit || title_hit,
        WindowMatchPolicy::All => {
            (app_id.is_empty() || app_hit) && (title_contains.is_empty() || title_hit)
        }
    }
}

/// Build the ranking query and boost map for `query`, with OR semantics for
/// window rules.
pub fn build_alias_context(query: &str, rules: &[AliasRule], items: &[ResultItem]) -> AliasContext {
    build_alias_context_with_policy(query, rules, items, WindowMatchPolicy::Any)
}

pub fn build_alias_context_with_policy(
    query: &str,
    rules: &[AliasRule],
    items: &[ResultItem],
    policy: WindowMatchPolicy,
) -> AliasContext {
    let key = normalize_token(query);
    let mut context = AliasContext {
        ranking_query: query.to_string(),
        boosts: HashMap::new(),
    };
    if key.is_empty() {
        return context;
    }

    let mut rewritten = false;
    for rule in rules.iter().filter(|rule| rule.alias == key) {
        match &rule.target {
            AliasTarget::Rewrite { query } => {
                // First rewrite wins
                if !rewritten {
                    context.ranking_query = query.clone();
                    rewritten = true;
                }
            }
            AliasTarget::App { app_id } => {
                for (index, item) in items.iter().enumerate() {
                    if item.kind == ResultKind::App && item.id.as_deref() == Some(app_id.as_str()) {
                        *context.boosts.entry(index).or_insert(0.0) += DIRECT_ALIAS_BOOST;
                    }
                }
            }
            AliasTarget::Window {
                app_id,
                title_contains,
            } => {
                for (index, item) in items.iter().enumerate() {
                    if window_matches(item, app_id, title_contains, policy) {
                        *context.boosts.entry(index).or_insert(0.0) += DIRECT_ALIAS_BOOST;
                    }
                }
            }
        }
    }

    context
}
