use strata_types::ObjectId;

use crate::error::{StoreError, StoreResult};
use crate::object::{Commit, Feature, FeatureType, ObjectKind, RevObject, RevTree};

/// Content-addressed, append-only object store.
///
/// All implementations must satisfy these invariants:
/// - Objects are immutable once written. Content-addressing guarantees this:
///   the same data always produces the same ID.
/// - `put` is idempotent: inserting identical content twice returns the same
///   ID and performs no duplicate write. Concurrent writers racing to insert
///   the same content is a no-op collision, never an error.
/// - Writes are durable once `put` returns; an ID is only ever published
///   after the underlying write completes, so readers never observe a
///   partially-written object.
/// - No update-in-place and no deletion; garbage collection is a maintenance
///   concern outside this contract.
/// - All I/O errors are propagated, never silently ignored.
pub trait ObjectStore: Send + Sync {
    /// Write an object and return its content-addressed ID.
    fn put(&self, object: &RevObject) -> StoreResult<ObjectId>;

    /// Read an object by ID without a kind expectation.
    ///
    /// Fails with [`StoreError::NotFound`] if absent.
    fn get_any(&self, id: &ObjectId) -> StoreResult<RevObject>;

    /// Read an object by ID, checking it has the expected kind.
    ///
    /// Fails with [`StoreError::NotFound`] if absent and
    /// [`StoreError::TypeMismatch`] if the stored kind differs.
    fn get(&self, id: &ObjectId, expected: ObjectKind) -> StoreResult<RevObject> {
        let obj = self.get_any(id)?;
        if obj.kind() != expected {
            return Err(StoreError::TypeMismatch {
                id: *id,
                expected,
                actual: obj.kind(),
            });
        }
        Ok(obj)
    }

    /// Check whether an object exists in the store.
    fn exists(&self, id: &ObjectId) -> StoreResult<bool>;

    /// Read multiple objects lazily.
    ///
    /// Each missing ID yields its own [`StoreError::NotFound`] item without
    /// aborting the rest of the batch; the caller decides whether partial
    /// results are tolerable.
    fn get_all<'a>(
        &'a self,
        ids: Vec<ObjectId>,
    ) -> Box<dyn Iterator<Item = StoreResult<RevObject>> + 'a> {
        Box::new(ids.into_iter().map(move |id| self.get_any(&id)))
    }

    /// Typed read: tree.
    fn get_tree(&self, id: &ObjectId) -> StoreResult<RevTree> {
        self.get(id, ObjectKind::Tree)?.into_tree()
    }

    /// Typed read: commit.
    fn get_commit(&self, id: &ObjectId) -> StoreResult<Commit> {
        self.get(id, ObjectKind::Commit)?.into_commit()
    }

    /// Typed read: feature.
    fn get_feature(&self, id: &ObjectId) -> StoreResult<Feature> {
        self.get(id, ObjectKind::Feature)?.into_feature()
    }

    /// Typed read: feature type.
    fn get_feature_type(&self, id: &ObjectId) -> StoreResult<FeatureType> {
        self.get(id, ObjectKind::FeatureType)?.into_feature_type()
    }
}
