//! Error types for the diff crate.

use strata_store::StoreError;

/// Errors that can occur during diff operations.
#[derive(Debug, thiserror::Error)]
pub enum DiffError {
    /// Store operation failed (missing object, wrong kind).
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Convenience alias for diff results.
pub type DiffResult<T> = Result<T, DiffError>;
