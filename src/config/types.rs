//! Configuration type definitions
//!
//! Every field is optional in the JSON file; accessors on [`Config`] fill in
//! defaults so callers never see a partially populated config.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::defaults::*;

// ============================================================================
// Ranking weights
// ============================================================================

/// Per-kind score bonus applied after fuzzy scoring.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingWeights {
    #[serde(default = "default_window_weight")]
    pub window: f64,
    #[serde(default = "default_app_weight")]
    pub app: f64,
    #[serde(default = "default_recent_weight")]
    pub recent: f64,
    #[serde(default = "default_file_weight")]
    pub file: f64,
    #[serde(default = "default_emoji_weight")]
    pub emoji: f64,
    #[serde(default = "default_utility_weight")]
    pub utility: f64,
}

fn default_window_weight() -> f64 {
    DEFAULT_WINDOW_WEIGHT
}
fn default_app_weight() -> f64 {
    DEFAULT_APP_WEIGHT
}
fn default_recent_weight() -> f64 {
    DEFAULT_RECENT_WEIGHT
}
fn default_file_weight() -> f64 {
    DEFAULT_FILE_WEIGHT
}
fn default_emoji_weight() -> f64 {
    DEFAULT_EMOJI_WEIGHT
}
fn default_utility_weight() -> f64 {
    DEFAULT_UTILITY_WEIGHT
}

impl Default for RankingWeights {
    fn default() -> Self {
        RankingWeights {
            window: DEFAULT_WINDOW_WEIGHT,
            app: DEFAULT_APP_WEIGHT,
            recent: DEFAULT_RECENT_WEIGHT,
            file: DEFAULT_FILE_WEIGHT,
            emoji: DEFAULT_EMOJI_WEIGHT,
            utility: DEFAULT_UTILITY_WEIGHT,
        }
    }
}

// ============================================================================
// Network-backed providers
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherConfig {
    #[serde(default = "default_weather_ttl_minutes")]
    pub ttl_minutes: u64,
    #[serde(default = "default_weather_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_weather_ttl_minutes() -> u64 {
    DEFAULT_WEATHER_TTL_MINUTES
}
fn default_weather_timeout_ms() -> u64 {
    DEFAULT_WEATHER_TIMEOUT_MS
}

impl Default for WeatherConfig {
    fn default() -> Self {
        WeatherConfig {
            ttl_minutes: DEFAULT_WEATHER_TTL_MINUTES,
            timeout_ms: DEFAULT_WEATHER_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimezoneConfig {
    /// How long a resolved city stays fresh (default: one day)
    #[serde(default = "default_timezone_fallback_ttl_minutes")]
    pub fallback_ttl_minutes: u64,
    #[serde(default = "default_timezone_fallback_timeout_ms")]
    pub fallback_timeout_ms: u64,
}

fn default_timezone_fallback_ttl_minutes() -> u64 {
    DEFAULT_TIMEZONE_FALLBACK_TTL_MINUTES
}
fn default_timezone_fallback_timeout_ms() -> u64 {
    DEFAULT_TIMEZONE_FALLBACK_TIMEOUT_MS
}

impl Default for TimezoneConfig {
    fn default() -> Self {
        TimezoneConfig {
            fallback_ttl_minutes: DEFAULT_TIMEZONE_FALLBACK_TTL_MINUTES,
            fallback_timeout_ms: DEFAULT_TIMEZONE_FALLBACK_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrencyConfig {
    #[serde(default = "default_currency_rate_ttl_hours")]
    pub rate_ttl_hours: u64,
}

fn default_currency_rate_ttl_hours() -> u64 {
    DEFAULT_CURRENCY_RATE_TTL_HOURS
}

impl Default for CurrencyConfig {
    fn default() -> Self {
        CurrencyConfig {
            rate_ttl_hours: DEFAULT_CURRENCY_RATE_TTL_HOURS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebSearchSettings {
    #[serde(default = "default_web_search_enabled")]
    pub enabled: bool,
    #[serde(default = "default_web_search_max_actions")]
    pub max_actions: usize,
    /// Persisted service list (JSON array string). None means built-in defaults.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub services_json: Option<String>,
}

fn default_web_search_enabled() -> bool {
    DEFAULT_WEB_SEARCH_ENABLED
}
fn default_web_search_max_actions() -> usize {
    DEFAULT_WEB_SEARCH_MAX_ACTIONS
}

impl Default for WebSearchSettings {
    fn default() -> Self {
        WebSearchSettings {
            enabled: DEFAULT_WEB_SEARCH_ENABLED,
            max_actions: DEFAULT_WEB_SEARCH_MAX_ACTIONS,
            services_json: None,
        }
    }
}

// ============================================================================
// Feature toggles
// ============================================================================

/// Providers that can be switched off individually.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    Windows,
    Apps,
    Recents,
    Files,
    Emoji,
    Calculator,
    Timezone,
    Currency,
    Weather,
    WebSearch,
}

impl Feature {
    pub const ALL: [Feature; 10] = [
        Feature::Windows,
        Feature::Apps,
        Feature::Recents,
        Feature::Files,
        Feature::Emoji,
        Feature::Calculator,
        Feature::Timezone,
        Feature::Currency,
        Feature::Weather,
        Feature::WebSearch,
    ];

    /// Config key under `features`
    pub fn key(self) -> &'static str {
        match self {
            Feature::Windows => "windows",
            Feature::Apps => "apps",
            Feature::Recents => "recents",
            Feature::Files => "files",
            Feature::Emoji => "emoji",
            Feature::Calculator => "calculator",
            Feature::Timezone => "timezone",
            Feature::Currency => "currency",
            Feature::Weather => "weather",
            Feature::WebSearch => "webSearch",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureToggles {
    #[serde(default = "enabled")]
    pub windows: bool,
    #[serde(default = "enabled")]
    pub apps: bool,
    #[serde(default = "enabled")]
    pub recents: bool,
    #[serde(default = "enabled")]
    pub files: bool,
    #[serde(default = "enabled")]
    pub emoji: bool,
    #[serde(default = "enabled")]
    pub calculator: bool,
    #[serde(default = "enabled")]
    pub timezone: bool,
    #[serde(default = "enabled")]
    pub currency: bool,
    #[serde(default = "enabled")]
    pub weather: bool,
    #[serde(default = "enabled")]
    pub web_search: bool,
}

fn enabled() -> bool {
    true
}

impl FeatureToggles {
    pub fn is_enabled(&self, feature: Feature) -> bool {
        match feature {
            Feature::Windows => self.windows,
            Feature::Apps => self.apps,
            Feature::Recents => self.recents,
            Feature::Files => self.files,
            Feature::Emoji => self.emoji,
            Feature::Calculator => self.calculator,
            Feature::Timezone => self.timezone,
            Feature::Currency => self.currency,
            Feature::Weather => self.weather,
            Feature::WebSearch => self.web_search,
        }
    }
}

impl Default for FeatureToggles {
    fn default() -> Self {
        FeatureToggles {
            windows: true,
            apps: true,
            recents: true,
            files: true,
            emoji: true,
            calculator: true,
            timezone: true,
            currency: true,
            weather: true,
            web_search: true,
        }
    }
}

// ============================================================================
// Root config
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weights: Option<RankingWeights>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_results: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_fuzzy_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub async_rank_threshold: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debounce_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weather: Option<WeatherConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<TimezoneConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<CurrencyConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_search: Option<WebSearchSettings>,
    /// Persisted alias rules (JSON array string)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aliases_json: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub learning_store_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<FeatureToggles>,
}

impl Config {
    pub fn get_weights(&self) -> RankingWeights {
        self.weights.unwrap_or_default()
    }

    /// Max visible rows, never below 1
    pub fn get_max_results(&self) -> usize {
        self.max_results.unwrap_or(DEFAULT_MAX_RESULTS).max(1)
    }

    pub fn get_min_fuzzy_score(&self) -> f64 {
        self.min_fuzzy_score
            .filter(|v| v.is_finite())
            .unwrap_or(DEFAULT_MIN_FUZZY_SCORE)
    }

    pub fn get_async_rank_threshold(&self) -> usize {
        self.async_rank_threshold.unwrap_or(DEFAULT_ASYNC_RANK_THRESHOLD)
    }

    pub fn get_debounce_ms(&self) -> u64 {
        self.debounce_ms.unwrap_or(DEFAULT_DEBOUNCE_MS)
    }

    pub fn get_weather(&self) -> WeatherConfig {
        self.weather.clone().unwrap_or_default()
    }

    pub fn get_timezone(&self) -> TimezoneConfig {
        self.timezone.clone().unwrap_or_default()
    }

    pub fn get_currency(&self) -> CurrencyConfig {
        self.currency.clone().unwrap_or_default()
    }

    pub fn get_web_search(&self) -> WebSearchSettings {
        self.web_search.clone().unwrap_or_default()
    }

    pub fn get_aliases_json(&self) -> &str {
        self.aliases_json.as_deref().unwrap_or("[]")
    }

    pub fn get_features(&self) -> FeatureToggles {
        self.features.clone().unwrap_or_default()
    }

    /// Learning store location, tilde-expanded
    pub fn get_learning_store_path(&self) -> PathBuf {
        match &self.learning_store_path {
            Some(path) => PathBuf::from(shellexpand::tilde(path).as_ref()),
            None => dirs::data_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join(APP_DIR_NAME)
                .join(DEFAULT_LEARNING_FILE),
        }
    }
}
