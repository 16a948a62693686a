use std::collections::HashMap;
use std::sync::RwLock;

use strata_types::ObjectId;
use tracing::trace;

use crate::error::{StoreError, StoreResult};
use crate::object::{RevObject, StoredObject};
use crate::traits::ObjectStore;

/// In-memory, HashMap-based object store.
///
/// Intended for tests and embedding. All objects are held in memory behind a
/// `RwLock` for safe concurrent access. Objects are kept in their canonical
/// serialized form and decoded on read.
pub struct InMemoryObjectStore {
    objects: RwLock<HashMap<ObjectId, StoredObject>>,
}

impl InMemoryObjectStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
        }
    }

    /// Number of objects currently stored.
    pub fn len(&self) -> usize {
        self.objects.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.objects.read().expect("lock poisoned").is_empty()
    }

    /// Return a sorted list of all object IDs in the store.
    pub fn all_ids(&self) -> Vec<ObjectId> {
        let map = self.objects.read().expect("lock poisoned");
        let mut ids: Vec<ObjectId> = map.keys().copied().collect();
        ids.sort();
        ids
    }
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectStore for InMemoryObjectStore {
    fn put(&self, object: &RevObject) -> StoreResult<ObjectId> {
        let stored = object.to_stored()?;
        let id = stored.compute_id();
        if id.is_null() {
            return Err(StoreError::NullObjectId);
        }
        let mut map = self.objects.write().expect("lock poisoned");
        // Idempotent: if already present, skip. Content-addressing guarantees
        // the same ID always maps to the same content, so a racing duplicate
        // insert is a harmless collision.
        map.entry(id).or_insert(stored);
        trace!(id = %id.short_hex(), kind = %object.kind(), "object stored");
        Ok(id)
    }

    fn get_any(&self, id: &ObjectId) -> StoreResult<RevObject> {
        let map = self.objects.read().expect("lock poisoned");
        let stored = map.get(id).ok_or(StoreError::NotFound(*id))?;
        RevObject::from_stored(stored)
    }

    fn exists(&self, id: &ObjectId) -> StoreResult<bool> {
        let map = self.objects.read().expect("lock poisoned");
        Ok(map.contains_key(id))
    }
}

impl std::fmt::Debug for InMemoryObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryObjectStore")
            .field("object_count", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{
        AttributeDescriptor, AttributeType, Feature, FeatureType, Node, ObjectKind, RevTree,
        Value,
    };

    fn make_type() -> FeatureType {
        FeatureType::new(
            "road",
            vec![AttributeDescriptor::new("name", AttributeType::Text)],
        )
    }

    fn make_feature(name: &str) -> Feature {
        Feature::new(make_type().id(), vec![Value::Text(name.into())])
    }

    #[test]
    fn put_then_get_returns_equal_content() {
        let store = InMemoryObjectStore::new();
        let obj = RevObject::Feature(make_feature("highway 9"));
        let id = store.put(&obj).unwrap();
        assert!(!id.is_null());

        let read_back = store.get_any(&id).unwrap();
        assert_eq!(read_back, obj);
    }

    #[test]
    fn put_is_idempotent() {
        let store = InMemoryObjectStore::new();
        let obj = RevObject::Feature(make_feature("highway 9"));
        let id1 = store.put(&obj).unwrap();
        let count = store.len();
        let id2 = store.put(&obj).unwrap();
        assert_eq!(id1, id2);
        assert_eq!(store.len(), count);
    }

    #[test]
    fn get_checks_expected_kind() {
        let store = InMemoryObjectStore::new();
        let id = store.put(&RevObject::FeatureType(make_type())).unwrap();
        let err = store.get(&id, ObjectKind::Feature).unwrap_err();
        assert!(matches!(err, StoreError::TypeMismatch { .. }));
        assert!(store.get(&id, ObjectKind::FeatureType).is_ok());
    }

    #[test]
    fn missing_object_is_not_found() {
        let store = InMemoryObjectStore::new();
        let id = ObjectId::from_bytes(b"never stored");
        assert!(!store.exists(&id).unwrap());
        assert!(matches!(
            store.get_any(&id),
            Err(StoreError::NotFound(missing)) if missing == id
        ));
    }

    #[test]
    fn get_all_reports_per_id_not_found() {
        let store = InMemoryObjectStore::new();
        let present = store.put(&RevObject::Tree(RevTree::empty())).unwrap();
        let missing = ObjectId::from_bytes(b"gone");

        let results: Vec<_> = store.get_all(vec![present, missing, present]).collect();
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(StoreError::NotFound(_))));
        assert!(results[2].is_ok());
    }

    #[test]
    fn typed_reads_decode_concrete_objects() {
        let store = InMemoryObjectStore::new();
        let tree = RevTree::leaf(
            vec![Node::feature("a", ObjectId::from_bytes(b"a"), ObjectId::NULL)],
            1,
            0,
        );
        let id = store.put(&RevObject::Tree(tree.clone())).unwrap();
        assert_eq!(store.get_tree(&id).unwrap(), tree);
    }

    #[test]
    fn all_ids_is_sorted() {
        let store = InMemoryObjectStore::new();
        store.put(&RevObject::Feature(make_feature("a"))).unwrap();
        store.put(&RevObject::Feature(make_feature("b"))).unwrap();
        store.put(&RevObject::Tree(RevTree::empty())).unwrap();
        let ids = store.all_ids();
        assert_eq!(ids.len(), 3);
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }
}
