use thiserror::Error;
use tracing::{error, warn};

use crate::palette::StatusVariant;

/// Domain-specific errors for the command palette
#[derive(Error, Debug)]
pub enum PaletteError {
    #[error("Catalog item '{title}' is invalid: {reason}")]
    Catalog { title: String, reason: String },

    #[error("Remote call to {endpoint} failed: {message}")]
    Remote { endpoint: String, message: String },

    #[error("Remote call to {endpoint} timed out after {timeout_ms}ms")]
    Timeout { endpoint: String, timeout_ms: u64 },

    #[error("Response stream failed: {0}")]
    Stream(String),

    #[error("Insertion failed: {0}")]
    Insertion(String),

    #[error("Clipboard unavailable: {0}")]
    Clipboard(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl PaletteError {
    /// Banner variant used when this error reaches the user.
    pub fn severity(&self) -> StatusVariant {
        match self {
            Self::Catalog { .. } => StatusVariant::Warning,
            Self::Remote { .. } => StatusVariant::Warning,
            Self::Timeout { .. } => StatusVariant::Warning,
            Self::Stream(_) => StatusVariant::Warning,
            Self::Insertion(_) => StatusVariant::Warning,
            Self::Clipboard(_) => StatusVariant::Danger,
            Self::Config(_) => StatusVariant::Warning,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            Self::Catalog { title, .. } => format!("Skipped command \"{}\"", title),
            Self::Remote { .. } => "Request failed; showing fallback response.".to_string(),
            Self::Timeout { .. } => "Request timed out; showing fallback response.".to_string(),
            Self::Stream(_) => "Response stream was interrupted.".to_string(),
            Self::Insertion(_) => "Couldn't insert here. Use Copy instead.".to_string(),
            Self::Clipboard(_) => "Copy failed. Check clipboard permissions.".to_string(),
            Self::Config(msg) => format!("Configuration issue: {}", msg),
        }
    }
}

/// Extension trait for silent error logging with caller location tracking.
/// Use when the operation is recoverable and the user doesn't need to know.
///
/// # Examples
///
/// ```ignore
/// use command_palette::error::ResultExt;
///
/// // Log and fall back to plain text if markup can't be copied
/// if clipboard.set_html(html, Some(text)).log_err().is_none() {
///     clipboard.set_text(text)?;
/// }
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

/// Panic in debug mode, log error in release mode.
///
/// Use for "impossible" states that should crash during development
/// but gracefully degrade in production.
///
/// ```ignore
/// let entry = match self.index.get(position) {
///     Some(entry) => entry,
///     None => {
///         debug_panic!("filtered position {} outside index", position);
///         return;
///     }
/// };
/// ```
#[macro_export]
macro_rules! debug_panic {
    ( $($fmt_arg:tt)* ) => {
        if cfg!(debug_assertions) {
            panic!( $($fmt_arg)* );
        } else {
            tracing::error!("IMPOSSIBLE STATE: {}", format_args!($($fmt_arg)*));
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_failures_are_warnings_not_errors() {
        let err = PaletteError::Timeout {
            endpoint: "https://example.test/ai".to_string(),
            timeout_ms: 15_000,
        };
        assert_eq!(err.severity(), StatusVariant::Warning);
        assert!(err.user_message().contains("fallback"));
        assert!(err.to_string().contains("15000ms"));
    }

    #[test]
    fn clipboard_failure_is_danger() {
        let err = PaletteError::Clipboard("no display".to_string());
        assert_eq!(err.severity(), StatusVariant::Danger);
    }

    #[test]
    fn insertion_failure_points_at_copy() {
        let err = PaletteError::Insertion("fragment".to_string());
        assert_eq!(err.severity(), StatusVariant::Warning);
        assert!(err.user_message().contains("Copy"));
        assert_eq!(err.to_string(), "Insertion failed: fragment");
    }

    #[test]
    fn result_ext_returns_value_or_none() {
        let ok: std::result::Result<u8, String> = Ok(3);
        assert_eq!(ok.log_err(), Some(3));
        let err: std::result::Result<u8, String> = Err("boom".to_string());
        assert_eq!(err.warn_on_err(), None);
    }
}
