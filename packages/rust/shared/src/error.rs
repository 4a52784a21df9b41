//! Error types for CrisisDesk.
//!
//! Library crates use [`CrisisDeskError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all CrisisDesk operations.
#[derive(Debug, thiserror::Error)]
pub enum CrisisDeskError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// The instruction template could not be loaded. Fatal to the session.
    #[error("instruction template unavailable at {path:?}: {reason}")]
    MissingTemplate { path: PathBuf, reason: String },

    /// Uploaded content does not match any recognized briefing format.
    #[error("unsupported upload: {0}")]
    UnsupportedUpload(String),

    /// The model collaborator failed (transport, provider, or empty reply).
    #[error("model call failed: {0}")]
    Model(String),

    /// Document assembly or serialization failed.
    #[error("document error: {0}")]
    Document(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Input validation error (empty question, bad flag value, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, CrisisDeskError>;

impl CrisisDeskError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a missing-template error for the given path.
    pub fn missing_template(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::MissingTemplate {
            path: path.into(),
            reason: reason.into(),
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
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = CrisisDeskError::config("missing API key");
        assert_eq!(err.to_string(), "config error: missing API key");

        let err = CrisisDeskError::Model("rate limited".into());
        assert_eq!(err.to_string(), "model call failed: rate limited");
    }

    #[test]
    fn missing_template_names_path() {
        let err = CrisisDeskError::missing_template("prompt_base.docx", "not found");
        assert!(matches!(err, CrisisDeskError::MissingTemplate { .. }));
        assert!(err.to_string().contains("prompt_base.docx"));
        assert!(err.to_string().contains("not found"));
    }
}
