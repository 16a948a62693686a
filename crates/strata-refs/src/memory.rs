//! In-memory reference and conflict stores for testing and ephemeral use.
//!
//! Both stores keep their data in a map behind a `RwLock`. Data is lost when
//! the store is dropped.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use tracing::trace;

use crate::conflicts::{Conflict, ConflictStore};
use crate::error::{RefError, Result};
use crate::names::{validate_branch_name, validate_tag_name};
use crate::traits::RefStore;
use crate::types::{self, Ref};

/// An in-memory implementation of [`RefStore`].
#[derive(Debug, Default)]
pub struct InMemoryRefStore {
    refs: RwLock<HashMap<String, Ref>>,
}

impl InMemoryRefStore {
    /// Create a new empty ref store.
    pub fn new() -> Self {
        Self::default()
    }
}

/// Validate the short name when writing into a managed namespace. Top-level
/// refs (`HEAD`, `MERGE_HEAD`, ...) are not name-checked.
fn validate_namespaced(name: &str) -> Result<()> {
    if let Some(branch) = name.strip_prefix(types::HEADS_PREFIX) {
        validate_branch_name(branch)?;
    } else if let Some(tag) = name.strip_prefix(types::TAGS_PREFIX) {
        validate_tag_name(tag)?;
    }
    Ok(())
}

impl RefStore for InMemoryRefStore {
    fn read_ref(&self, name: &str) -> Result<Option<Ref>> {
        let refs = self.refs.read().expect("lock poisoned");
        Ok(refs.get(name).cloned())
    }

    fn compare_and_set(
        &self,
        name: &str,
        expected: Option<&Ref>,
        new: Option<Ref>,
    ) -> Result<()> {
        if new.is_some() {
            validate_namespaced(name)?;
        }

        let mut refs = self.refs.write().expect("lock poisoned");
        if refs.get(name) != expected {
            return Err(RefError::ConcurrentModification {
                name: name.to_string(),
            });
        }

        match new {
            Some(value) => {
                trace!(name, "updating ref");
                refs.insert(name.to_string(), value);
            }
            None => {
                trace!(name, "deleting ref");
                refs.remove(name);
            }
        }
        Ok(())
    }

    fn list_refs(&self, prefix: &str) -> Result<Vec<(String, Ref)>> {
        let refs = self.refs.read().expect("lock poisoned");
        let mut result: Vec<(String, Ref)> = refs
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        result.sort_by(|(a, _), (b, _)| a.cmp(b));
        Ok(result)
    }

    // Single write-lock acquisition instead of the default read-then-CAS
    // retry loop.
    fn force_set(&self, name: &str, new: Ref) -> Result<()> {
        validate_namespaced(name)?;
        let mut refs = self.refs.write().expect("lock poisoned");
        trace!(name, "force-updating ref");
        refs.insert(name.to_string(), new);
        Ok(())
    }

    fn force_delete(&self, name: &str) -> Result<bool> {
        let mut refs = self.refs.write().expect("lock poisoned");
        trace!(name, "force-deleting ref");
        Ok(refs.remove(name).is_some())
    }
}

/// An in-memory implementation of [`ConflictStore`].
///
/// Backed by a `BTreeMap` so [`ConflictStore::read_all`] is ordered by path
/// for free.
#[derive(Debug, Default)]
pub struct InMemoryConflictStore {
    conflicts: RwLock<BTreeMap<String, Conflict>>,
}

impl InMemoryConflictStore {
    /// Create a new empty conflict store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConflictStore for InMemoryConflictStore {
    fn write_all(&self, conflicts: Vec<Conflict>) -> Result<()> {
        let mut map = self.conflicts.write().expect("lock poisoned");
        for conflict in conflicts {
            trace!(path = %conflict.path, "recording conflict");
            map.insert(conflict.path.clone(), conflict);
        }
        Ok(())
    }

    fn read_all(&self) -> Result<Vec<Conflict>> {
        let map = self.conflicts.read().expect("lock poisoned");
        Ok(map.values().cloned().collect())
    }

    fn get(&self, path: &str) -> Result<Option<Conflict>> {
        let map = self.conflicts.read().expect("lock poisoned");
        Ok(map.get(path).cloned())
    }

    fn remove(&self, path: &str) -> Result<bool> {
        let mut map = self.conflicts.write().expect("lock poisoned");
        Ok(map.remove(path).is_some())
    }

    fn clear(&self) -> Result<()> {
        let mut map = self.conflicts.write().expect("lock poisoned");
        map.clear();
        Ok(())
    }

    fn len(&self) -> Result<usize> {
        let map = self.conflicts.read().expect("lock poisoned");
        Ok(map.len())
    }
}
