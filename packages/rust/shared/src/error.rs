//! Error types for Tramitero.
//!
//! Library crates use [`TramiteroError`] via `thiserror`.
//! The CLI app wraps this with `color-eyre` for rich diagnostics.
//!
//! Per-record and per-batch problems during ingestion are not errors at this
//! level: they are absorbed, logged, and counted by the merger. Only
//! aggregate-level failures (nothing retained, index publish rejected)
//! surface as values of this type.

use std::path::PathBuf;

/// Top-level error type for all Tramitero operations.
#[derive(Debug, thiserror::Error)]
pub enum TramiteroError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP transport error.
    #[error("network error: {0}")]
    Network(String),

    /// JSON or content parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// The external vector index rejected a reset, upsert, or query call.
    #[error("index error: {0}")]
    Index(String),

    /// The completion API rejected a request or returned an unusable reply.
    #[error("completion error: {0}")]
    Completion(String),

    /// No valid records were retained from any input batch.
    #[error("no valid records were retained from any input batch; nothing to index")]
    EmptyIngest,

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (schema mismatch, invalid format, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, TramiteroError>;

impl TramiteroError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
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
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = TramiteroError::config("missing API key");
        assert_eq!(err.to_string(), "config error: missing API key");

        let err = TramiteroError::Index("collection rejected".into());
        assert!(err.to_string().contains("collection rejected"));
    }

    #[test]
    fn empty_ingest_names_the_cause() {
        let err = TramiteroError::EmptyIngest;
        assert!(err.to_string().contains("no valid records"));
    }
}
