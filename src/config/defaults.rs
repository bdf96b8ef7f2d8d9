//! Default configuration values
//!
//! All constants used throughout the config module are defined here.

/// Per-kind ranking weights
pub const DEFAULT_WINDOW_WEIGHT: f64 = 30.0;
pub const DEFAULT_APP_WEIGHT: f64 = 20.0;
pub const DEFAULT_RECENT_WEIGHT: f64 = 10.0;
pub const DEFAULT_FILE_WEIGHT: f64 = 10.0;
pub const DEFAULT_EMOJI_WEIGHT: f64 = 10.0;
pub const DEFAULT_UTILITY_WEIGHT: f64 = 0.0;
/// Action rows are not configurable
pub const ACTION_WEIGHT: f64 = 25.0;

/// Result list sizing and filtering
pub const DEFAULT_MAX_RESULTS: usize = 10;
pub const DEFAULT_MIN_FUZZY_SCORE: f64 = -20.0;
/// Candidate count at which ranking is deferred to the host's idle tick
pub const DEFAULT_ASYNC_RANK_THRESHOLD: usize = 180;
pub const DEFAULT_DEBOUNCE_MS: u64 = 60;

/// Weather cache
pub const DEFAULT_WEATHER_TTL_MINUTES: u64 = 10;
pub const DEFAULT_WEATHER_TIMEOUT_MS: u64 = 4000;

/// Timezone city fallback cache
pub const DEFAULT_TIMEZONE_FALLBACK_TTL_MINUTES: u64 = 24 * 60;
pub const DEFAULT_TIMEZONE_FALLBACK_TIMEOUT_MS: u64 = 1000;

/// Currency rate snapshot age before rows are flagged stale
pub const DEFAULT_CURRENCY_RATE_TTL_HOURS: u64 = 12;

/// Web search
pub const DEFAULT_WEB_SEARCH_ENABLED: bool = true;
pub const DEFAULT_WEB_SEARCH_MAX_ACTIONS: usize = 5;

/// Learning store file name under the data directory
pub const DEFAULT_LEARNING_FILE: &str = "learning.json";

/// Application directory name under config/data dirs
pub const APP_DIR_NAME: &str = "hop-launcher";
