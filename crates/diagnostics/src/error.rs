//! Error types for diagnostic runs

use thiserror::Error;

/// Failures reported by a [`ConfigSource`](crate::source::ConfigSource) operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("permission denied reading {0}")]
    PermissionDenied(String),

    #[error("transient source failure: {0}")]
    Transient(String),

    #[error("unsupported operation: {0}")]
    Unsupported(String),
}

impl SourceError {
    /// Transient failures are the only class worth retrying; everything
    /// else fails the same way on every attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// Fatal failures of a diagnostic run.
///
/// Only identifier resolution aborts a run. Sub-record failures degrade
/// the affected facet to `Unknown` and are surfaced in the report instead.
#[derive(Error, Debug)]
pub enum DiagnosticError {
    #[error("invalid distribution identifier '{id}': {reason}")]
    InvalidIdentifier { id: String, reason: String },

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("diagnostic run cancelled")]
    Cancelled,
}

/// Result type for diagnostic operations.
pub type Result<T> = std::result::Result<T, DiagnosticError>;
