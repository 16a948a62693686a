//! Error types for reference and conflict operations.

use thiserror::Error;

/// Errors that can occur during reference operations.
#[derive(Debug, Error)]
pub enum RefError {
    /// A compare-and-set update observed a value other than the expected one.
    ///
    /// Another writer moved the ref between the caller's read and its update.
    #[error("concurrent modification of ref: {name}")]
    ConcurrentModification { name: String },

    /// The ref name is invalid.
    #[error("invalid ref name: {name}: {reason}")]
    InvalidName { name: String, reason: String },

    /// A symbolic ref chain exceeded the resolution depth limit.
    #[error("symbolic ref chain too deep starting at: {name}")]
    SymbolicChainTooDeep { name: String },
}

/// Convenience type alias for ref operations.
pub type Result<T> = std::result::Result<T, RefError>;
