//! Offline currency conversion over a USD-pivot rate table.

use std::collections::HashMap;
use std::sync::OnceLock;

use chrono::{DateTime, Local, Utc};
use regex::Regex;

use super::Provider;
use crate::clock::{SharedClock, MS_PER_HOUR};
use crate::model::{ResultItem, ResultKind, SearchMode};

/// Units of each currency per 1 USD
const DEFAULT_RATES: &[(&str, f64)] = &[
    ("USD", 1.0),
    ("EUR", 0.92),
    ("GBP", 0.79),
    ("JPY", 150.5),
    ("CAD", 1.36),
    ("AUD", 1.53),
    ("BRL", 4.98),
    ("CHF", 0.88),
];

fn query_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(\d+(?:\.\d+)?)\s*([a-z]{3})\s+to\s+([a-z]{3})$")
            .expect("valid currency regex")
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct CurrencyQuery {
    pub amount: f64,
    pub from: String,
    pub to: String,
}

pub fn parse_query(query: &str) -> Option<CurrencyQuery> {
    let caps = query_regex().captures(query.trim())?;
    Some(CurrencyQuery {
        amount: caps[1].parse().ok()?,
        from: caps[2].to_uppercase(),
        to: caps[3].to_uppercase(),
    })
}

/// Convert through the USD pivot, rounded to cents.
pub fn convert(amount: f64, from: &str, to: &str, rates: &HashMap<String, f64>) -> Option<f64> {
    let from_rate = *rates.get(from)?;
    let to_rate = *rates.get(to)?;
    if !from_rate.is_finite() || !to_rate.is_finite() || from_rate <= 0.0 {
        return None;
    }
    let converted = amount / from_rate * to_rate;
    Some((converted * 100.0).round() / 100.0)
}

/// A set of rates and when they were captured.
#[derive(Debug, Clone, PartialEq)]
pub struct RateSnapshot {
    pub rates: HashMap<String, f64>,
    pub updated_at_ms: u64,
}

impl RateSnapshot {
    pub fn builtin(updated_at_ms: u64) -> Self {
        RateSnapshot {
            rates: DEFAULT_RATES
                .iter()
                .map(|(code, rate)| (code.to_string(), *rate))
                .collect(),
            updated_at_ms,
        }
    }

    pub fn is_stale(&self, now_ms: u64, ttl_hours: u64) -> bool {
        now_ms.saturating_sub(self.updated_at_ms) > ttl_hours.saturating_mul(MS_PER_HOUR)
    }
}

fn format_timestamp(epoch_ms: u64) -> String {
    DateTime::<Utc>::from_timestamp_millis(epoch_ms as i64)
        .map(|utc| utc.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

pub struct CurrencyProvider {
    snapshot: RateSnapshot,
    ttl_hours: u64,
    clock: SharedClock,
}

impl CurrencyProvider {
    /// Starts from the built-in table, stamped with the current time.
    pub fn new(ttl_hours: u64, clock: SharedClock) -> Self {
        let snapshot = RateSnapshot::builtin(clock.now_ms());
        CurrencyProvider {
            snapshot,
            ttl_hours,
            clock,
        }
    }

    /// Install rates obtained by the host.
    pub fn set_rates(&mut self, snapshot: RateSnapshot) {
        self.snapshot = snapshot;
    }

    pub fn snapshot(&self) -> &RateSnapshot {
        &self.snapshot
    }
}

impl Provider for CurrencyProvider {
    fn name(&self) -> &str {
        "currency"
    }

    fn results(&mut self, query: &str, mode: SearchMode) -> anyhow::Result<Vec<ResultItem>> {
        if !matches!(mode, SearchMode::All | SearchMode::Currency) {
            return Ok(Vec::new());
        }
        let Some(parsed) = parse_query(query) else {
            return Ok(Vec::new());
        };
        let Some(value) = convert(parsed.amount, &parsed.from, &parsed.to, &self.snapshot.rates)
        else {
            return Ok(Vec::new());
        };

        let stale = self.snapshot.is_stale(self.clock.now_ms(), self.ttl_hours);
        let primary = format!("{} {}", value, parsed.to);
        let secondary = format!(
            "{} {} • Rates updated {}{}",
            parsed.amount,
            parsed.from,
            format_timestamp(self.snapshot.updated_at_ms),
            if stale { " (stale)" } else { "" }
        );

        Ok(vec![ResultItem::new(ResultKind::Utility, primary.clone(), secondary)
            .with_id(format!(
                "currency:{}:{}:{}",
                parsed.amount, parsed.from, parsed.to
            ))
            .with_copy_text(primary)
            .with_search_text(query.trim())])
    }
}
