//! Error types for repository operations.

use thiserror::Error;

/// Errors that can occur in the high-level repository API.
#[derive(Debug, Error)]
pub enum RepoError {
    /// The commit would not change the current tree.
    #[error("nothing to commit: the tree is unchanged")]
    NothingToCommit,

    /// A previous merge left unresolved conflicts; resolve or abort first.
    #[error("cannot run operation while merge conflicts exist")]
    ConflictsUnresolved,

    /// No author/committer identity is available for the operation.
    #[error("user identity not configured: set user.name and user.email")]
    MissingIdentity,

    /// HEAD does not point at a branch.
    #[error("HEAD is not on a branch")]
    DetachedHead,

    /// The named branch does not exist.
    #[error("no such branch: {name}")]
    UnknownBranch { name: String },

    /// Deleting the branch `HEAD` is on is not allowed.
    #[error("cannot delete current branch: {name}")]
    CannotDeleteCurrentBranch { name: String },

    /// The current branch has no commits yet.
    #[error("the current branch has no commits")]
    UnbornBranch,

    /// No merge is in progress to conclude or abort.
    #[error("no merge in progress")]
    NoMergeInProgress,

    /// Object store failure.
    #[error(transparent)]
    Store(#[from] strata_store::StoreError),

    /// Tree build or lookup failure.
    #[error(transparent)]
    Tree(#[from] strata_tree::TreeError),

    /// Differencing failure.
    #[error(transparent)]
    Diff(#[from] strata_diff::DiffError),

    /// Commit graph failure.
    #[error(transparent)]
    Graph(#[from] strata_graph::GraphError),

    /// Ref or conflict store failure.
    #[error(transparent)]
    Ref(#[from] strata_refs::RefError),

    /// Merge engine failure.
    #[error(transparent)]
    Merge(#[from] strata_merge::MergeError),
}

/// Convenience type alias for repository operations.
pub type Result<T> = std::result::Result<T, RepoError>;
