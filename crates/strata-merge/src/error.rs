//! Error types for merge operations.

use thiserror::Error;

/// Errors that can occur during a merge.
#[derive(Debug, Error)]
pub enum MergeError {
    /// Contradictory request flags. Reported before any mutation.
    #[error("invalid merge configuration: {0}")]
    ConfigurationError(String),

    /// The requested merge would produce no change.
    #[error("nothing to merge: the commits are already merged")]
    NothingToMerge,

    /// The merge stopped on unresolved conflicts. The conflict set has been
    /// persisted for inspection and the repository is in a merging state.
    #[error("merge stopped with {count} unresolved conflict(s)")]
    MergeConflict { count: usize },

    /// An octopus merge hit a conflict during one of its pairwise steps.
    /// Nothing was committed.
    #[error("cannot merge more than two commits when conflicts exist")]
    IllegalMerge,

    /// A previous merge left unresolved conflicts that must be resolved or
    /// aborted first.
    #[error("cannot run operation while merge conflicts exist")]
    ConflictsUnresolved,

    /// Object store failure.
    #[error(transparent)]
    Store(#[from] strata_store::StoreError),

    /// Tree differencing failure.
    #[error(transparent)]
    Diff(#[from] strata_diff::DiffError),

    /// Tree rebuild failure.
    #[error(transparent)]
    Tree(#[from] strata_tree::TreeError),

    /// Commit graph traversal failure.
    #[error(transparent)]
    Graph(#[from] strata_graph::GraphError),

    /// Ref or conflict store failure.
    #[error(transparent)]
    Ref(#[from] strata_refs::RefError),
}

/// Convenience type alias for merge operations.
pub type Result<T> = std::result::Result<T, MergeError>;
