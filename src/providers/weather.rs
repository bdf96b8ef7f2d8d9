//! Current weather via Open-Meteo, fronted by a stale-while-revalidate cache.
//!
//! The network call is injected ([`JsonFetch`]); this module only builds the
//! URLs, interprets the JSON and renders rows.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::Local;
use serde_json::Value;

use super::{JsonFetch, Provider};
use crate::clock::{SharedClock, MS_PER_MINUTE};
use crate::config::WeatherConfig;
use crate::error::HopError;
use crate::model::{ResultItem, ResultKind, SearchMode};
use crate::swr_cache::{CacheStats, CacheView, FetchFn, SwrCache, UpdateCallback};

const SOURCE: &str = "Open-Meteo";
const GEOCODE_URL: &str = "https://geocoding-api.open-meteo.com/v1/search";
const FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";
const QUERY_PREFIXES: &[&str] = &["weather ", "wx "];
const QUERY_SUFFIX: &str = " weather";

#[derive(Debug, Clone, PartialEq)]
pub struct WeatherPayload {
    pub location: String,
    pub pretty_text: String,
    pub observed_at: String,
}

// ============================================================================
// Query parsing
// ============================================================================

fn strip_leading_in(location: &str) -> &str {
    let trimmed = location.trim();
    match trimmed.get(..3) {
        Some(head) if head.eq_ignore_ascii_case("in ") => trimmed[3..].trim(),
        _ => trimmed,
    }
}

/// Extract the location from a weather query. `allow_bare` accepts input
/// without a weather prefix or suffix (the router already stripped it).
pub fn parse_location(query: &str, allow_bare: bool) -> Option<String> {
    let raw = query.trim();
    if raw.is_empty() {
        return None;
    }
    let lower = raw.to_lowercase();

    let location = if let Some(prefix) = QUERY_PREFIXES.iter().find(|p| lower.starts_with(*p)) {
        strip_leading_in(&raw[prefix.len()..])
    } else if lower.ends_with(QUERY_SUFFIX) && raw.len() > QUERY_SUFFIX.len() {
        let location = strip_leading_in(&raw[..raw.len() - QUERY_SUFFIX.len()]);
        if location.chars().count() < 2 {
            return None;
        }
        location
    } else if allow_bare {
        strip_leading_in(raw)
    } else {
        return None;
    };

    (!location.is_empty()).then(|| location.to_string())
}

/// Cache key: lowercase with whitespace runs collapsed.
pub fn normalize_key(location: &str) -> String {
    location
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

// ============================================================================
// Open-Meteo
// ============================================================================

/// WMO weather interpretation code to a label and icon.
pub fn weather_condition(code: i64) -> (&'static str, &'static str) {
    match code {
        0 => ("Clear", "☀"),
        1 | 2 => ("Partly cloudy", "⛅"),
        3 => ("Overcast", "☁"),
        45 | 48 => ("Fog", "🌫"),
        51 | 53 | 55 | 56 | 57 => ("Drizzle", "🌦"),
        61 | 63 | 65 | 66 | 67 | 80 | 81 | 82 => ("Rain", "🌧"),
        71 | 73 | 75 | 77 | 85 | 86 => ("Snow", "❄"),
        95 | 96 | 99 => ("Thunderstorm", "⛈"),
        _ => ("Weather", "🌡"),
    }
}

fn place_label(geo: &Value, fallback: &str) -> String {
    let segments: Vec<&str> = ["name", "admin1", "country_code"]
        .iter()
        .filter_map(|field| geo.get(*field).and_then(Value::as_str))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    if segments.is_empty() {
        fallback.to_string()
    } else {
        segments.join(", ")
    }
}

fn number(value: &Value, field: &str) -> anyhow::Result<f64> {
    value
        .get(field)
        .and_then(Value::as_f64)
        .filter(|n| n.is_finite())
        .ok_or_else(|| HopError::ParseMiss("weather".to_string()).into())
}

pub fn geocode_url(location: &str) -> String {
    format!(
        "{}?name={}&count=1&language=en&format=json",
        GEOCODE_URL,
        urlencoding::encode(location)
    )
}

/// Geocode `location`, then read the current conditions there.
pub fn fetch_weather(request_json: &JsonFetch, location: &str) -> anyhow::Result<WeatherPayload> {
    let geocode = request_json(&geocode_url(location)).context("weather geocoding failed")?;
    let geo = geocode
        .get("results")
        .and_then(|results| results.get(0))
        .ok_or(HopError::LocationNotFound)?;

    let latitude = number(geo, "latitude")?;
    let longitude = number(geo, "longitude")?;

    let forecast_url = format!(
        "{}?latitude={}&longitude={}&current=temperature_2m,weather_code,wind_speed_10m&temperature_unit=celsius&wind_speed_unit=kmh",
        FORECAST_URL, latitude, longitude
    );
    let forecast = request_json(&forecast_url).context("weather forecast failed")?;
    let current = forecast
        .get("current")
        .ok_or_else(|| HopError::ParseMiss("weather".to_string()))?;

    let temperature = number(current, "temperature_2m")?;
    let code = number(current, "weather_code")?;
    let wind = number(current, "wind_speed_10m")?;

    let (condition, icon) = weather_condition(code as i64);
    let pretty_text = format!(
        "{}: {} {} {}C Wind {} km/h",
        place_label(geo, location),
        condition,
        icon,
        temperature.round() as i64,
        wind.round() as i64
    );

    Ok(WeatherPayload {
        location: location.to_string(),
        pretty_text,
        observed_at: Local::now().format("%H:%M:%S").to_string(),
    })
}

// ============================================================================
// Rows
// ============================================================================

fn weather_row(payload: &WeatherPayload, key: &str, location: &str, stale: bool) -> ResultItem {
    ResultItem::new(
        ResultKind::Utility,
        payload.pretty_text.clone(),
        format!(
            "{} • Updated {}{}",
            SOURCE,
            payload.observed_at,
            if stale { " (stale)" } else { "" }
        ),
    )
    .with_id(format!("weather:{}", key))
    .with_copy_text(payload.pretty_text.clone())
    .with_search_text(location)
}

fn pending_row(location: &str, key: &str) -> ResultItem {
    ResultItem::new(
        ResultKind::Utility,
        format!("Fetching weather for {}...", location),
        SOURCE,
    )
    .with_id(format!("weather-pending:{}", key))
    .with_search_text(location)
}

fn error_row(location: &str, key: &str, reason: &str, stale: bool) -> ResultItem {
    ResultItem::new(
        ResultKind::Utility,
        format!("Weather unavailable for {}", location),
        format!(
            "{} {}{}",
            SOURCE,
            reason,
            if stale { " (retrying...)" } else { "" }
        ),
    )
    .with_id(format!("weather-error:{}", key))
    .with_search_text(location)
}

// ============================================================================
// Provider
// ============================================================================

pub struct WeatherProvider {
    cache: SwrCache<WeatherPayload>,
}

impl WeatherProvider {
    pub fn new(config: &WeatherConfig, request_json: JsonFetch, clock: SharedClock) -> Self {
        let fetch: FetchFn<WeatherPayload> =
            Arc::new(move |location: &str| fetch_weather(&request_json, location));
        let cache = SwrCache::new(
            "weather",
            config.ttl_minutes.saturating_mul(MS_PER_MINUTE),
            Duration::from_millis(config.timeout_ms),
            fetch,
            clock,
        );
        WeatherProvider { cache }
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Block until in-flight fetches settle. Used by the CLI and tests.
    pub fn wait_until_settled(&mut self, deadline: Duration) -> bool {
        self.cache.wait_until_settled(deadline)
    }
}

impl Provider for WeatherProvider {
    fn name(&self) -> &str {
        "weather"
    }

    fn results(&mut self, query: &str, mode: SearchMode) -> anyhow::Result<Vec<ResultItem>> {
        let location = match mode {
            SearchMode::Weather => parse_location(query, true),
            SearchMode::All => parse_location(query, false),
            _ => None,
        };
        let Some(location) = location else {
            return Ok(Vec::new());
        };
        let key = normalize_key(&location);
        if key.is_empty() {
            return Ok(Vec::new());
        }

        let row = match self.cache.lookup(&key) {
            CacheView::Pending => pending_row(&location, &key),
            CacheView::Ready { payload, stale } => weather_row(&payload, &key, &location, stale),
            CacheView::Failed { reason, stale } => error_row(&location, &key, &reason, stale),
        };
        Ok(vec![row])
    }

    fn set_update_callback(&mut self, callback: Option<UpdateCallback>) {
        self.cache.set_update_callback(callback);
    }
}
