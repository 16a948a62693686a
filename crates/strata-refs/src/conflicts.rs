//! Persisted merge conflict state.
//!
//! When a merge stops on conflicts, the conflicting paths are written here so
//! a later session can inspect and resolve them. Each entry records the two
//! disagreeing versions; the common ancestor version is recoverable from the
//! merge base when needed.

use serde::{Deserialize, Serialize};
use strata_types::ObjectId;

use crate::error::Result;

/// A single conflicted path from a stopped merge.
///
/// Either side may be [`ObjectId::NULL`], meaning that side deleted the
/// feature.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    /// Full feature path, e.g. `roads/road1`.
    pub path: String,
    /// Version on the current branch.
    pub ours: ObjectId,
    /// Version on the branch being merged in.
    pub theirs: ObjectId,
}

impl Conflict {
    pub fn new(path: impl Into<String>, ours: ObjectId, theirs: ObjectId) -> Self {
        Self {
            path: path.into(),
            ours,
            theirs,
        }
    }
}

/// Storage for the conflict set of an in-progress merge.
///
/// Implementations must be thread-safe (`Send + Sync`). The set is keyed by
/// path; writing a conflict for a path that already has one replaces it.
pub trait ConflictStore: Send + Sync {
    /// Record a batch of conflicts.
    fn write_all(&self, conflicts: Vec<Conflict>) -> Result<()>;

    /// All recorded conflicts, ordered by path.
    fn read_all(&self) -> Result<Vec<Conflict>>;

    /// The conflict for a specific path, if any.
    fn get(&self, path: &str) -> Result<Option<Conflict>>;

    /// Drop the conflict for a path (the caller resolved it). Returns
    /// `Ok(true)` if a conflict was present.
    fn remove(&self, path: &str) -> Result<bool>;

    /// Drop all conflicts (merge aborted or committed).
    fn clear(&self) -> Result<()>;

    /// Number of outstanding conflicts.
    fn len(&self) -> Result<usize>;

    /// Returns `true` if no conflicts are outstanding.
    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}
