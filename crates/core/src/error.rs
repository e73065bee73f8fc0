//! Error taxonomy (§7).
//!
//! Eight variants, each carrying enough context to decide retry behavior
//! without re-deriving it from the message string. A single
//! `thiserror`-derived enum with a `Result<T>` alias and an
//! `is_retryable()` helper.

use thiserror::Error;

/// Result type alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for all public engine operations (§7).
#[derive(Debug, Error)]
pub enum Error {
    /// Dimension mismatch, malformed predicate, role collision, wrong
    /// cursor. Surfaced to the caller, never retried.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Unknown id. Surfaced, never retried.
    #[error("not found: {0}")]
    NotFound(String),

    /// Transient remote-storage error. Retried with `retryPolicy`,
    /// surfaced only after exhaustion.
    #[error("storage failure: {0}")]
    StorageFailure(String),

    /// A write lost an optimistic version check. Retried once internally
    /// then surfaced.
    #[error("concurrency conflict: expected version {expected}, found {actual}")]
    ConcurrencyConflict {
        /// Version the writer expected to overwrite.
        expected: u64,
        /// Version actually present.
        actual: u64,
    },

    /// Leader unreachable or migration consensus did not commit.
    /// Surfaced, not retried — caller decides.
    #[error("consensus timeout: {0}")]
    ConsensusTimeout(String),

    /// Write on read-only, search on write-only, any write on frozen.
    /// Surfaced immediately.
    #[error("mode violation: {0}")]
    ModeViolation(String),

    /// Query exceeded its budget. Surfaced with any partial results
    /// (carried alongside this error by the caller, not inside it).
    #[error("operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Data-integrity violation (e.g. HNSW graph corruption detected
    /// during search). The node refuses further writes and raises a loud
    /// diagnostic; it remains readable if possible.
    #[error("fatal data-integrity violation: {0}")]
    Fatal(String),
}

impl Error {
    /// Whether the caller's retry policy should be applied to this error.
    ///
    /// Only `StorageFailure` is retried automatically by the propagation
    /// policy in §7; `ConcurrencyConflict` is retried once internally by
    /// the write path itself, not by the generic retry loop.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::StorageFailure(_))
    }

    /// Structured `{kind, message, context}` triple for the externally
    /// visible error shape (§7 "User-visible behaviour").
    pub fn kind(&self) -> &'static str {
        match self {
            Error::InvalidArgument(_) => "InvalidArgument",
            Error::NotFound(_) => "NotFound",
            Error::StorageFailure(_) => "StorageFailure",
            Error::ConcurrencyConflict { .. } => "ConcurrencyConflict",
            Error::ConsensusTimeout(_) => "ConsensusTimeout",
            Error::ModeViolation(_) => "ModeViolation",
            Error::Timeout(_) => "Timeout",
            Error::Fatal(_) => "Fatal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_storage_failure_is_retryable() {
        assert!(Error::StorageFailure("x".into()).is_retryable());
        assert!(!Error::NotFound("x".into()).is_retryable());
        assert!(!Error::ConcurrencyConflict { expected: 1, actual: 2 }.is_retryable());
        assert!(!Error::Fatal("corrupt".into()).is_retryable());
    }

    #[test]
    fn kind_matches_variant() {
        assert_eq!(Error::InvalidArgument("x".into()).kind(), "InvalidArgument");
        assert_eq!(Error::Fatal("x".into()).kind(), "Fatal");
    }
}
