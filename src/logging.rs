//! Structured JSONL logging plus human-readable stderr output.
//!
//! This module provides dual-output logging:
//! - **JSONL to file** (~/.command-palette/logs/command-palette.jsonl) - structured for tooling
//! - **Pretty to stderr** - human-readable for developers
//!
//! # Usage
//!
//! ```rust,ignore
//! use command_palette::logging;
//!
//! // Initialize logging - MUST keep guard alive for duration of program
//! let _guard = logging::init();
//!
//! tracing::info!(event_type = "palette", action = "opened", "Palette opened");
//! ```
//!
//! Payload text (prompts, generated responses, inserted content) is never
//! logged; only lengths and counts are.

use std::fs::{self, OpenOptions};
use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

const LOG_FILE_NAME: &str = "command-palette.jsonl";

/// Guard that must be kept alive for the duration of the program.
/// Dropping this guard will flush and close the log file.
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Initialize the dual-output logging system.
///
/// Returns a guard that MUST be kept alive for the duration of the program.
/// If the log file cannot be opened, only the stderr layer is installed.
pub fn init() -> LoggingGuard {
    let log_dir = get_log_dir();
    if let Err(e) = fs::create_dir_all(&log_dir) {
        eprintln!("[LOGGING] Failed to create log directory: {}", e);
    }

    let log_path = log_dir.join(LOG_FILE_NAME);

    // Environment filter - default to info, allow override via RUST_LOG
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,ureq=warn,rustls=warn"));

    // Pretty layer for stderr (human developers)
    fn pretty_layer<S>() -> impl tracing_subscriber::Layer<S>
    where
        S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .with_target(true)
            .with_level(true)
            .with_thread_ids(false)
            .compact()
    }

    let file = OpenOptions::new().create(true).append(true).open(&log_path);

    let file_guard = match file {
        Ok(file) => {
            // Non-blocking writer so a slow disk never stalls key handling
            let (non_blocking_file, guard) = tracing_appender::non_blocking(file);

            let json_layer = fmt::layer()
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

            let _ = tracing_subscriber::registry()
                .with(env_filter)
                .with(json_layer)
                .with(pretty_layer())
                .try_init();
            Some(guard)
        }
        Err(e) => {
            eprintln!("[LOGGING] Failed to open log file: {}", e);
            let _ = tracing_subscriber::registry()
                .with(env_filter)
                .with(pretty_layer())
                .try_init();
            None
        }
    };

    tracing::info!(
        event_type = "app_lifecycle",
        action = "started",
        log_path = %log_path.display(),
        "Palette logging initialized"
    );

    LoggingGuard {
        _file_guard: file_guard,
    }
}

/// Get the log directory path (~/.command-palette/logs/)
fn get_log_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".command-palette").join("logs"))
        .unwrap_or_else(|| std::env::temp_dir().join("command-palette-logs"))
}

/// Get the path to the JSONL log file
pub fn log_path() -> PathBuf {
    get_log_dir().join(LOG_FILE_NAME)
}

// =============================================================================
// STRUCTURED LOGGING HELPERS
// =============================================================================

/// Log a palette lifecycle event (opened, closed, activated, ...)
pub fn log_palette_event(palette_id: &str, action: &str, details: Option<&str>) {
    match details {
        Some(details) => tracing::info!(
            event_type = "palette_event",
            palette_id = palette_id,
            action = action,
            details = details,
            "Palette {}", action
        ),
        None => tracing::info!(
            event_type = "palette_event",
            palette_id = palette_id,
            action = action,
            "Palette {}", action
        ),
    }
}

/// Log a stream session milestone with its size counters
pub fn log_stream_event(session: u64, action: &str, text_len: usize, structured: bool) {
    tracing::debug!(
        event_type = "stream_event",
        session = session,
        action = action,
        text_len = text_len,
        structured = structured,
        "Stream session {} {}", session, action
    );
}

/// Log the outcome of an insertion attempt
pub fn log_insert_result(method: &str, success: bool, payload_len: usize) {
    if success {
        tracing::info!(
            event_type = "insert_event",
            method = method,
            success = success,
            payload_len = payload_len,
            "Inserted via {}", method
        );
    } else {
        tracing::warn!(
            event_type = "insert_event",
            method = method,
            success = success,
            payload_len = payload_len,
            "Insertion failed (last method: {})", method
        );
    }
}
