//! Structured JSONL logging plus human-readable stderr output.
//!
//! - **JSONL to file** (`<data_dir>/hop-launcher/logs/hop-launcher.jsonl`)
//! - **Compact to stderr** for developers
//!
//! The library only emits `tracing` events; the binary decides whether a
//! subscriber is installed by calling [`init`].
//!
//! ```rust,ignore
//! let _guard = hop_launcher::logging::init();
//! tracing::info!(event_type = "search", mode = "all", "Search started");
//! ```

use std::fs::{self, File, OpenOptions};
use std::path::PathBuf;

use tracing::Subscriber;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Guard that must be kept alive for the duration of the program.
/// Dropping it flushes and closes the log file.
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Initialize the dual-output logging system.
///
/// Returns a guard that MUST be kept alive for the duration of the program.
/// When the log file cannot be opened only the stderr layer is installed.
pub fn init() -> LoggingGuard {
    let log_dir = log_dir();
    if let Err(e) = fs::create_dir_all(&log_dir) {
        eprintln!("[LOGGING] Failed to create log directory: {}", e);
    }
    let log_path = log_dir.join("hop-launcher.jsonl");

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file = match OpenOptions::new().create(true).append(true).open(&log_path) {
        Ok(file) => Some(file),
        Err(e) => {
            eprintln!("[LOGGING] Failed to open log file: {}", e);
            None
        }
    };

    let (subscriber, file_guard) = build_subscriber(env_filter, file);
    subscriber.init();

    tracing::info!(
        event_type = "app_lifecycle",
        action = "started",
        log_path = %log_path.display(),
        "Logging initialized"
    );

    LoggingGuard {
        _file_guard: file_guard,
    }
}

/// JSONL file layer (when a file is given) plus the compact stderr layer.
fn build_subscriber(
    env_filter: EnvFilter,
    file: Option<File>,
) -> (impl Subscriber + Send + Sync + 'static, Option<WorkerGuard>) {
    let pretty_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(false)
        .compact();

    let (json_layer, file_guard) = match file {
        Some(file) => {
            // Non-blocking so a slow disk never stalls the search thread
            let (non_blocking_file, guard) = tracing_appender::non_blocking(file);
            let layer = fmt::layer()
                .json()
                .with_writer(non_blocking_file)
                .with_timer(fmt::time::UtcTime::rfc_3339())
                .with_target(true)
                .with_level(true)
                .with_thread_ids(false)
                .with_thread_names(false)
                .with_file(false)
                .with_line_number(false)
                .with_span_events(FmtSpan::NONE);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(pretty_layer);
    (subscriber, file_guard)
}

/// Log directory (`<data_dir>/hop-launcher/logs`), falling back to the temp dir.
fn log_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("hop-launcher").join("logs"))
        .unwrap_or_else(|| std::env::temp_dir().join("hop-launcher-logs"))
}
