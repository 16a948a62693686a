//! The [`RefStore`] trait defining the reference storage interface.
//!
//! Any backend (in-memory, filesystem, database) implements this trait to
//! provide named reference management. All mutation goes through
//! [`RefStore::compare_and_set`]: an update states the value it expects to
//! replace, and fails with [`RefError::ConcurrentModification`] if another
//! writer got there first. Refs are the single mutable entry point into an
//! otherwise immutable object graph, so this is the one place the system
//! needs an atomicity discipline.

use strata_types::ObjectId;

use crate::error::{RefError, Result};
use crate::types::Ref;

/// Maximum length of a symbolic ref chain before resolution gives up.
const MAX_SYMBOLIC_DEPTH: usize = 8;

/// Storage backend for named references.
///
/// Implementations must be thread-safe (`Send + Sync`). The namespace follows
/// a hierarchical layout:
///
/// - `HEAD`, `MERGE_HEAD`, `ORIG_HEAD`, `STAGE_HEAD`, `WORK_HEAD` at top level
/// - `refs/heads/*` for branches
/// - `refs/tags/*` for tags
pub trait RefStore: Send + Sync {
    /// Read a ref by its canonical name (e.g. `refs/heads/main`).
    ///
    /// Returns `Ok(None)` if the ref does not exist. Symbolic refs are
    /// returned as-is; use [`resolve`](RefStore::resolve) to chase them.
    fn read_ref(&self, name: &str) -> Result<Option<Ref>>;

    /// Atomically update a ref, conditioned on its current value.
    ///
    /// `expected` is the value the caller last observed (`None` for "the ref
    /// does not exist yet"); `new` is the value to install (`None` deletes
    /// the ref). If the stored value differs from `expected`, nothing changes
    /// and [`RefError::ConcurrentModification`] is returned.
    fn compare_and_set(
        &self,
        name: &str,
        expected: Option<&Ref>,
        new: Option<Ref>,
    ) -> Result<()>;

    /// List all refs whose canonical name starts with `prefix`, sorted by
    /// name. Pass `""` to list all refs, `"refs/heads/"` for branches only.
    fn list_refs(&self, prefix: &str) -> Result<Vec<(String, Ref)>>;

    /// Resolve a ref name to the object id it ultimately points at, chasing
    /// symbolic refs.
    ///
    /// Returns `Ok(None)` if the ref does not exist, or if a symbolic chain
    /// ends at a missing ref (an unborn branch: `HEAD` pointing at a branch
    /// with no commits yet).
    fn resolve(&self, name: &str) -> Result<Option<ObjectId>> {
        let mut current = name.to_string();
        for _ in 0..MAX_SYMBOLIC_DEPTH {
            match self.read_ref(&current)? {
                None => return Ok(None),
                Some(Ref::Direct(id)) => return Ok(Some(id)),
                Some(Ref::Symbolic(target)) => current = target,
            }
        }
        Err(RefError::SymbolicChainTooDeep {
            name: name.to_string(),
        })
    }

    /// For a symbolic ref, the canonical name of the ref it points at. For a
    /// direct ref or a missing ref, `Ok(None)`.
    fn symbolic_target(&self, name: &str) -> Result<Option<String>> {
        match self.read_ref(name)? {
            Some(Ref::Symbolic(target)) => Ok(Some(target)),
            _ => Ok(None),
        }
    }

    /// Write a ref unconditionally, overwriting any current value.
    ///
    /// Reserved for transient bookkeeping refs (`MERGE_HEAD`, `ORIG_HEAD`,
    /// the stage/work refs). Branch tips should move through
    /// [`compare_and_set`](RefStore::compare_and_set). The default retries
    /// the read-then-update until it lands, so a racing writer cannot make
    /// it fail; backends with native atomic writes should override it.
    fn force_set(&self, name: &str, new: Ref) -> Result<()> {
        loop {
            let current = self.read_ref(name)?;
            match self.compare_and_set(name, current.as_ref(), Some(new.clone())) {
                Err(RefError::ConcurrentModification { .. }) => continue,
                other => return other,
            }
        }
    }

    /// Delete a ref unconditionally. Returns `Ok(true)` if it existed.
    fn force_delete(&self, name: &str) -> Result<bool> {
        loop {
            match self.read_ref(name)? {
                None => return Ok(false),
                Some(current) => {
                    match self.compare_and_set(name, Some(&current), None) {
                        Ok(()) => return Ok(true),
                        Err(RefError::ConcurrentModification { .. }) => continue,
                        Err(e) => return Err(e),
                    }
                }
            }
        }
    }

    /// List all branch refs.
    fn branches(&self) -> Result<Vec<(String, Ref)>> {
        self.list_refs(crate::types::HEADS_PREFIX)
    }

    /// List all tag refs.
    fn tags(&self) -> Result<Vec<(String, Ref)>> {
        self.list_refs(crate::types::TAGS_PREFIX)
    }
}
