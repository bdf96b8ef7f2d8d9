use thiserror::Error;
use tracing::{error, warn};

/// Domain-specific errors for the launcher core
#[derive(Error, Debug)]
pub enum HopError {
    #[error("Invalid {what} configuration: {message}")]
    InvalidConfig { what: &'static str, message: String },

    #[error("Fetch failed for '{url}': {message}")]
    Fetch { url: String, message: String },

    #[error("{0} timeout")]
    Timeout(String),

    #[error("location not found")]
    LocationNotFound,

    #[error("{0} parse miss")]
    ParseMiss(String),

    #[error("Provider '{provider}' failed: {message}")]
    Provider { provider: String, message: String },

    #[error("I/O error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl HopError {
    /// Short reason shown in "unavailable" rows.
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidConfig { what, .. } => format!("{} config ignored", what),
            Self::Fetch { message, .. } => message.clone(),
            Self::Timeout(what) => format!("{} timeout", what),
            Self::LocationNotFound => "location not found".to_string(),
            Self::ParseMiss(what) => format!("{} parse miss", what),
            Self::Provider { provider, .. } => format!("{} unavailable", provider),
            Self::Io { path, .. } => format!("could not access {}", path),
        }
    }
}

/// Reason string for a failed fetch, preferring the domain message when the
/// error carries a `HopError`.
pub fn failure_reason(err: &anyhow::Error) -> String {
    match err.downcast_ref::<HopError>() {
        Some(hop) => hop.user_message(),
        None => err.to_string(),
    }
}

/// Extension trait for silent error logging with caller location tracking.
/// Use when the operation is recoverable and the user doesn't need to know.
///
/// # Examples
///
/// ```ignore
/// use hop_launcher::error::ResultExt;
///
/// let store = LearningStore::load(&path).warn_on_err().unwrap_or_default();
/// ```
pub trait ResultExt<T> {
    /// Log error with caller location and return None. Use for recoverable failures.
    fn log_err(self) -> Option<T>;
    /// Log as warning with caller location and return None. Use for expected failures.
    fn warn_on_err(self) -> Option<T>;
}

impl<T, E: std::fmt::Debug> ResultExt<T> for std::result::Result<T, E> {
    #[track_caller]
    fn log_err(self) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(error) => {
                let caller = std::panic::Location::caller();
                error!(
                    error = ?error,
                    file = caller.file(),
                    line = caller.line(),
                    "Operation failed"
                );
                None
            }
        }
    }

    #[track_caller]
    fn warn_on_err(self) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(error) => {
                let caller = std::panic::Location::caller();
                warn!(
                    error = ?error,
                    file = caller.file(),
                    line = caller.line(),
                    "Operation had warning"
                );
                None
            }
        }
    }
}
