//! Configuration loading from the file system

use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

use super::defaults::APP_DIR_NAME;
use super::types::Config;
use crate::error::HopError;

/// Default config location: `<config_dir>/hop-launcher/config.json`
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from(shellexpand::tilde("~/.config").as_ref()))
        .join(APP_DIR_NAME)
        .join("config.json")
}

/// Load configuration from the default location.
pub fn load_config() -> Config {
    load_config_from(&default_config_path())
}

/// Load configuration from `path`.
///
/// Returns `Config::default()` when the file is missing, unreadable or
/// not valid JSON. Never fails.
#[instrument(name = "load_config", fields(path = %path.display()))]
pub fn load_config_from(path: &Path) -> Config {
    if !path.exists() {
        info!("Config file not found, using defaults");
        return Config::default();
    }

    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            warn!(error = %e, "Failed to read config file, using defaults");
            return Config::default();
        }
    };

    parse_config(&content)
}

/// Parse config JSON, falling back to defaults on any error.
pub fn parse_config(content: &str) -> Config {
    if content.trim().is_empty() {
        return Config::default();
    }
    match serde_json::from_str::<Config>(content) {
        Ok(config) => {
            info!("Successfully loaded config");
            config
        }
        Err(e) => {
            let error = HopError::InvalidConfig {
                what: "launcher",
                message: e.to_string(),
            };
            warn!(error = %error, "Failed to parse config JSON, using defaults");
            Config::default()
        }
    }
}
