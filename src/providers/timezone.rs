//! Current time in a zone, by alias, city or IANA name.
//!
//! Known names are answered from the static lookup table. In timezone mode a
//! city the table does not know goes through a stale-while-revalidate cache
//! whose fetch resolves the city to an IANA zone.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono_tz::Tz;
use serde_json::Value;

use super::weather::geocode_url;
use super::{JsonFetch, Provider};
use crate::clock::{SharedClock, MS_PER_MINUTE};
use crate::config::TimezoneConfig;
use crate::error::HopError;
use crate::model::{ResultItem, ResultKind, SearchMode};
use crate::swr_cache::{CacheStats, CacheView, FetchFn, SwrCache, UpdateCallback};
use crate::timezone_lookup::{find_matches, format_zone_time, has_exact_token};

const MAX_STATIC_ROWS: usize = 6;

/// Cities that are not an IANA zone segment of their own.
const CITY_ZONES: &[(&str, &str)] = &[
    ("atlanta", "America/New_York"),
    ("austin", "America/Chicago"),
    ("bangalore", "Asia/Kolkata"),
    ("barcelona", "Europe/Madrid"),
    ("boston", "America/New_York"),
    ("dallas", "America/Chicago"),
    ("frankfurt", "Europe/Berlin"),
    ("geneva", "Europe/Zurich"),
    ("hamburg", "Europe/Berlin"),
    ("houston", "America/Chicago"),
    ("kyoto", "Asia/Tokyo"),
    ("las vegas", "America/Los_Angeles"),
    ("miami", "America/New_York"),
    ("milan", "Europe/Rome"),
    ("munich", "Europe/Berlin"),
    ("osaka", "Asia/Tokyo"),
    ("philadelphia", "America/New_York"),
    ("portland", "America/Los_Angeles"),
    ("san diego", "America/Los_Angeles"),
    ("washington", "America/New_York"),
];

fn normalize_city(city: &str) -> String {
    city.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Resolver backed by the built-in city table.
pub fn builtin_city_resolver() -> FetchFn<String> {
    Arc::new(|city: &str| -> anyhow::Result<String> {
        let key = normalize_city(city);
        CITY_ZONES
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, iana)| iana.to_string())
            .ok_or_else(|| anyhow::Error::from(HopError::LocationNotFound))
    })
}

/// Resolver that asks Open-Meteo geocoding for the city's `timezone`.
pub fn geocoding_city_resolver(request_json: JsonFetch) -> FetchFn<String> {
    Arc::new(move |city: &str| -> anyhow::Result<String> {
        let response = request_json(&geocode_url(city)).context("timezone geocoding failed")?;
        let first = response
            .get("results")
            .and_then(|results| results.get(0))
            .ok_or(HopError::LocationNotFound)?;
        let iana = first
            .get("timezone")
            .and_then(Value::as_str)
            .filter(|zone| zone.parse::<Tz>().is_ok())
            .ok_or_else(|| HopError::ParseMiss("timezone".to_string()))?;
        Ok(iana.to_string())
    })
}

fn zone_row(label: &str, iana: &str, query: &str, stale: bool) -> Option<ResultItem> {
    let time = format_zone_time(iana)?;
    Some(
        ResultItem::new(
            ResultKind::Utility,
            format!("{} • {}", label.to_uppercase(), time),
            format!("{}{}", iana, if stale { " (stale)" } else { "" }),
        )
        .with_id(format!("timezone:{}", iana))
        .with_search_text(query),
    )
}

pub struct TimezoneProvider {
    fallback: SwrCache<String>,
}

impl TimezoneProvider {
    pub fn new(config: &TimezoneConfig, resolver: FetchFn<String>, clock: SharedClock) -> Self {
        let fallback = SwrCache::new(
            "timezone",
            config.fallback_ttl_minutes.saturating_mul(MS_PER_MINUTE),
            Duration::from_millis(config.fallback_timeout_ms),
            resolver,
            clock,
        );
        TimezoneProvider { fallback }
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.fallback.stats()
    }

    pub fn wait_until_settled(&mut self, deadline: Duration) -> bool {
        self.fallback.wait_until_settled(deadline)
    }

    fn fallback_row(&mut self, city: &str) -> Option<ResultItem> {
        let key = normalize_city(city);
        let row = match self.fallback.lookup(&key) {
            CacheView::Pending => ResultItem::new(
                ResultKind::Utility,
                format!("Resolving timezone for {}...", city),
                "Timezone lookup",
            )
            .with_id(format!("timezone-pending:{}", key))
            .with_search_text(city),
            CacheView::Ready { payload, stale } => zone_row(city, &payload, city, stale)?,
            CacheView::Failed { reason, stale } => ResultItem::new(
                ResultKind::Utility,
                format!("Timezone unavailable for {}", city),
                format!("{}{}", reason, if stale { " (retrying...)" } else { "" }),
            )
            .with_id(format!("timezone-error:{}", key))
            .with_search_text(city),
        };
        Some(row)
    }
}

impl Provider for TimezoneProvider {
    fn name(&self) -> &str {
        "timezone"
    }

    fn results(&mut self, query: &str, mode: SearchMode) -> anyhow::Result<Vec<ResultItem>> {
        let city = query.trim();
        if city.is_empty() {
            return Ok(Vec::new());
        }
        match mode {
            SearchMode::Timezone => {}
            // Bare words only become clocks when they name a zone exactly
            SearchMode::All if has_exact_token(city) => {}
            _ => return Ok(Vec::new()),
        }

        let rows: Vec<ResultItem> = find_matches(city)
            .into_iter()
            .take(MAX_STATIC_ROWS)
            .filter_map(|m| zone_row(&m.alias, &m.iana, city, false))
            .collect();

        if rows.is_empty() && mode == SearchMode::Timezone {
            return Ok(self.fallback_row(city).into_iter().collect());
        }
        Ok(rows)
    }

    fn set_update_callback(&mut self, callback: Option<UpdateCallback>) {
        self.fallback.set_update_callback(callback);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use serde_json::json;

    const WAIT: Duration = Duration::from_secs(5);

    fn provider() -> TimezoneProvider {
        TimezoneProvider::new(
            &TimezoneConfig::default(),
            builtin_city_resolver(),
            ManualClock::new(0),
        )
    }

    #[test]
    fn test_static_alias_row() {
        let mut tz = provider();
        let rows = tz.results("pst", SearchMode::Timezone).unwrap();
        assert_eq!(rows[0].id.as_deref(), Some("timezone:America/Los_Angeles"));
        assert_eq!(rows[0].secondary_text, "America/Los_Angeles");
        assert!(rows[0].primary_text.starts_with("PST • "));
        assert!(rows.len() <= MAX_STATIC_ROWS);
    }

    #[test]
    fn test_all_mode_needs_exact_token() {
        let mut tz = provider();
        assert!(!tz.results("zurich", SearchMode::All).unwrap().is_empty());
        assert!(tz.results("zur", SearchMode::All).unwrap().is_empty());
        assert!(tz.results("zurich", SearchMode::Apps).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_city_goes_through_fallback() {
        let mut tz = provider();
        let rows = tz.results("Boston", SearchMode::Timezone).unwrap();
        assert_eq!(rows[0].primary_text, "Resolving timezone for Boston...");
        assert_eq!(rows[0].id.as_deref(), Some("timezone-pending:boston"));
        assert!(tz.wait_until_settled(WAIT));

        let rows = tz.results("Boston", SearchMode::Timezone).unwrap();
        assert!(rows[0].primary_text.starts_with("BOSTON • "));
        assert_eq!(rows[0].secondary_text, "America/New_York");
        assert_eq!(tz.cache_stats().fetches_started, 1);
    }

    #[test]
    fn test_unresolvable_city_is_error_row() {
        let mut tz = provider();
        tz.results("atlantis", SearchMode::Timezone).unwrap();
        assert!(tz.wait_until_settled(WAIT));

        let rows = tz.results("atlantis", SearchMode::Timezone).unwrap();
        assert_eq!(rows[0].primary_text, "Timezone unavailable for atlantis");
        assert_eq!(rows[0].secondary_text, "location not found");
    }

    #[test]
    fn test_geocoding_resolver() {
        let request: JsonFetch = Arc::new(|url: &str| {
            if url.contains("name=boston") {
                Ok(json!({"results": [{"name": "Boston", "timezone": "America/New_York"}]}))
            } else if url.contains("name=nowhere") {
                Ok(json!({}))
            } else {
                Ok(json!({"results": [{"name": "Odd", "timezone": "Mars/Base"}]}))
            }
        });
        let resolve = geocoding_city_resolver(request);
        assert_eq!(resolve("boston").unwrap(), "America/New_York");

        let err = resolve("nowhere").unwrap_err();
        assert_eq!(crate::error::failure_reason(&err), "location not found");
        let err = resolve("odd").unwrap_err();
        assert_eq!(crate::error::failure_reason(&err), "timezone parse miss");
    }
}
