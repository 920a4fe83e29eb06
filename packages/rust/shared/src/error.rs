//! Error types for Narrator.
//!
//! Library crates use [`NarratorError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all Narrator operations.
#[derive(Debug, thiserror::Error)]
pub enum NarratorError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// The content-extraction service was unreachable, failed, returned
    /// nothing for the search term, or timed out.
    #[error("content fetch failed: {0}")]
    RemoteFetch(String),

    /// The keyword-extraction service failed on one sentence.
    #[error("keyword extraction failed on sentence {index}: {message}")]
    RemoteAnnotation { index: usize, message: String },

    /// The loaded document is missing its required inputs or is not valid JSON.
    #[error("malformed document: {message}")]
    MalformedDocument { message: String },

    /// Document store error (serialization, key resolution).
    #[error("storage error: {0}")]
    Storage(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, NarratorError>;

impl NarratorError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a malformed-document error from any displayable message.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedDocument {
            message: msg.into(),
        }
    }

    /// Create an annotation error for the sentence at `index`.
    pub fn annotation(index: usize, msg: impl Into<String>) -> Self {
        Self::RemoteAnnotation {
            index,
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
