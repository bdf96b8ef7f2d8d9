//! Flattened, sorted view of the learning store for settings screens and
//! the CLI.

use serde::Serialize;

use super::LearningStore;

pub const DEFAULT_INSIGHT_LIMIT: usize = 10;
pub const MAX_INSIGHT_LIMIT: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InsightSort {
    /// Most launched first
    #[default]
    Count,
    /// Most recently launched first
    Recent,
}

impl InsightSort {
    /// Anything other than `"recent"` sorts by count.
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("recent") {
            InsightSort::Recent
        } else {
            InsightSort::Count
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightRow {
    pub query: String,
    pub app_id: String,
    pub count: u32,
    pub last_used_ms: u64,
}

/// Top `limit` (clamped to 1..=50) (query, app) pairs.
pub fn insights(store: &LearningStore, limit: usize, sort: InsightSort) -> Vec<InsightRow> {
    let mut rows: Vec<InsightRow> = store
        .iter()
        .map(|(query, app_id, learned)| InsightRow {
            query: query.to_string(),
            app_id: app_id.to_string(),
            count: learned.count,
            last_used_ms: learned.last_used_ms,
        })
        .collect();

    rows.sort_by(|a, b| {
        let primary = match sort {
            InsightSort::Count => b
                .count
                .cmp(&a.count)
                .then_with(|| b.last_used_ms.cmp(&a.last_used_ms)),
            InsightSort::Recent => b
                .last_used_ms
                .cmp(&a.last_used_ms)
                .then_with(|| b.count.cmp(&a.count)),
        };
        primary
            .then_with(|| a.query.cmp(&b.query))
            .then_with(|| a.app_id.cmp(&b.app_id))
    });

    rows.truncate(limit.clamp(1, MAX_INSIGHT_LIMIT));
    rows
}
