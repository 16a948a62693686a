//! Error types for commit graph operations.

use strata_store::StoreError;

/// Errors that can occur while navigating the commit graph.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// Store operation failed (missing commit, wrong kind).
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Convenience alias for graph results.
pub type GraphResult<T> = Result<T, GraphError>;
