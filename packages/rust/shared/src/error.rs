//! Error types for rfcpub.
//!
//! Library crates use [`RfcPubError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all rfcpub operations.
#[derive(Debug, thiserror::Error)]
pub enum RfcPubError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The external converter could not be started at all.
    #[error("converter `{program}` is not available: {source}")]
    ConverterUnavailable {
        program: String,
        source: std::io::Error,
    },

    /// The external converter ran and exited unsuccessfully.
    #[error("converter `{program}` failed (exit code {}): {stderr}", fmt_code(.exit_code))]
    ConverterFailed {
        program: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    /// A git command run by `sync` exited unsuccessfully.
    #[error("git {args} failed (exit code {}): {stderr}", fmt_code(.exit_code))]
    Git {
        args: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    /// Data validation error (bad slug, existing draft, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, RfcPubError>;

fn fmt_code(code: &Option<i32>) -> String {
    code.map_or_else(|| "none".to_string(), |c| c.to_string())
}

impl RfcPubError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Exit code of the failed external process, if this error came from one.
    ///
    /// The CLI exits with this code so CI sees the same status the converter
    /// or git reported.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::ConverterFailed { exit_code, .. } | Self::Git { exit_code, .. } => *exit_code,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = RfcPubError::config("unknown runtime");
        assert_eq!(err.to_string(), "config error: unknown runtime");

        let err = RfcPubError::validation("slug 'Foo Bar' is not kebab-case");
        assert!(err.to_string().contains("Foo Bar"));
    }

    #[test]
    fn converter_failure_reports_exit_code() {
        let err = RfcPubError::ConverterFailed {
            program: "pandoc".into(),
            exit_code: Some(64),
            stderr: "Unknown input format".into(),
        };
        assert_eq!(err.exit_code(), Some(64));
        assert_eq!(
            err.to_string(),
            "converter `pandoc` failed (exit code 64): Unknown input format"
        );
    }

    #[test]
    fn signal_killed_process_has_no_code() {
        let err = RfcPubError::Git {
            args: "push origin HEAD".into(),
            exit_code: None,
            stderr: String::new(),
        };
        assert_eq!(err.exit_code(), None);
        assert!(err.to_string().contains("exit code none"));
        assert_eq!(RfcPubError::validation("x").exit_code(), None);
    }
}
