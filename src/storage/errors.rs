//! # Storage Errors
//!
//! Error types for the executor boundary. Transient backend failures are
//! propagated unmodified; retry policy belongs to the executor, not the
//! engine.

use thiserror::Error;

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors crossing the executor boundary
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    /// Backend failure (connection, timeout, driver). Propagated as-is.
    #[error("storage backend error: {0}")]
    Backend(String),

    /// The backend rejected a write for violating a constraint
    /// (e.g. the unique active-sequencing-group index).
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    /// A fetched row did not decode into the expected shape
    #[error("unexpected row shape: {0}")]
    UnexpectedRow(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = StorageError::Backend("connection reset".to_string());
        assert_eq!(err.to_string(), "storage backend error: connection reset");

        let err = StorageError::ConstraintViolation("uq_sequencing_group_active".to_string());
        assert!(err.to_string().contains("uq_sequencing_group_active"));
    }
}
