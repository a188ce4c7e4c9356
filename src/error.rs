//! Error types for the marks engine.
//!
//! The loader and the query functions report failures through
//! [`EngineError`]. The CLI layer wraps these in `anyhow` with context.

use std::path::PathBuf;
use thiserror::Error;

/// Failures surfaced by loading or querying a marks table.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// The source is missing, unreadable, or lacks a required column.
    #[error("data unavailable ({}): {reason}", path.display())]
    DataUnavailable { path: PathBuf, reason: String },

    /// A row failed schema validation. `line` is 1-indexed and counts the header.
    #[error("malformed record at line {line}, column '{column}': {reason}")]
    MalformedRecord {
        line: u64,
        column: String,
        reason: String,
    },

    /// A caller-supplied parameter is outside its documented domain.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Result alias used by the engine.
pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    pub fn unavailable(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::DataUnavailable {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn malformed(line: u64, column: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedRecord {
            line,
            column: column.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Whether the session must halt instead of showing a scoped message.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::InvalidArgument(_))
    }
}
