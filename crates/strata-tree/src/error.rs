//! Error types for tree indexing.

use strata_store::StoreError;

/// Errors that can occur while building or walking trees.
#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    /// A path was malformed (empty, or an empty segment).
    #[error("invalid path: {0:?}")]
    InvalidPath(String),

    /// A non-leaf path segment resolved to a feature.
    #[error("path segment is not a tree: {0:?}")]
    NotATree(String),

    /// Store operation failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Convenience alias for tree results.
pub type TreeResult<T> = Result<T, TreeError>;
