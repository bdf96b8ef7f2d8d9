//! Configuration module - launcher settings
//!
//! - `defaults` - All default constant values
//! - `types` - Configuration struct definitions (Config, RankingWeights, etc.)
//! - `loader` - File system loading and parsing

mod defaults;
mod loader;
mod types;

pub use defaults::{
    ACTION_WEIGHT, DEFAULT_ASYNC_RANK_THRESHOLD, DEFAULT_CURRENCY_RATE_TTL_HOURS,
    DEFAULT_MAX_RESULTS, DEFAULT_MIN_FUZZY_SCORE, DEFAULT_WEATHER_TIMEOUT_MS,
    DEFAULT_WEATHER_TTL_MINUTES, DEFAULT_WEB_SEARCH_MAX_ACTIONS,
};

pub use types::{
    Config, CurrencyConfig, Feature, FeatureToggles, RankingWeights, TimezoneConfig,
    WeatherConfig, WebSearchSettings,
};

pub use loader::{default_config_path, load_config, load_config_from, parse_config};

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
