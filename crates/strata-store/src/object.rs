use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strata_types::ObjectId;

use crate::error::{StoreError, StoreResult};

/// The kind of object stored.
///
/// The object model is a closed set of variants; the kind tag is checked at
/// every store boundary so a reference can never silently resolve to an
/// object of the wrong shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    /// A single record: ordered, typed attribute values.
    Feature,
    /// Schema descriptor for features: attribute names and types.
    FeatureType,
    /// Index of named child entries, flat or hash-bucketed.
    Tree,
    /// Snapshot marker: root tree reference plus parent commits.
    Commit,
    /// Named pointer to a commit with its own message and tagger.
    Tag,
}

impl ObjectKind {
    /// Discriminant byte prefixed to the hash preimage so that two objects
    /// of different kinds can never collide on the same ID.
    pub fn tag_byte(&self) -> u8 {
        match self {
            Self::Feature => b'f',
            Self::FeatureType => b't',
            Self::Tree => b'T',
            Self::Commit => b'c',
            Self::Tag => b'g',
        }
    }
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Feature => write!(f, "feature"),
            Self::FeatureType => write!(f, "featuretype"),
            Self::Tree => write!(f, "tree"),
            Self::Commit => write!(f, "commit"),
            Self::Tag => write!(f, "tag"),
        }
    }
}

/// A stored object: kind tag + canonical serialized data.
///
/// `StoredObject` is the unit of storage. The store never interprets the
/// contents of the data — it is a pure key-value store keyed by content hash.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredObject {
    /// The type of this object.
    pub kind: ObjectKind,
    /// The canonical serialized bytes of the object.
    pub data: Vec<u8>,
}

impl StoredObject {
    /// Create a new stored object from kind and data.
    pub fn new(kind: ObjectKind, data: Vec<u8>) -> Self {
        Self { kind, data }
    }

    /// Compute the content-addressed ID for this object.
    ///
    /// The preimage is the kind discriminant byte followed by the canonical
    /// serialized data.
    pub fn compute_id(&self) -> ObjectId {
        let mut preimage = Vec::with_capacity(self.data.len() + 1);
        preimage.push(self.kind.tag_byte());
        preimage.extend_from_slice(&self.data);
        ObjectId::from_bytes(&preimage)
    }
}

fn encode<T: Serialize>(kind: ObjectKind, value: &T) -> StoreResult<StoredObject> {
    let data =
        bincode::serialize(value).map_err(|e| StoreError::Serialization(e.to_string()))?;
    Ok(StoredObject::new(kind, data))
}

fn decode<T: for<'de> Deserialize<'de>>(
    obj: &StoredObject,
    kind: ObjectKind,
) -> StoreResult<T> {
    if obj.kind != kind {
        return Err(StoreError::TypeMismatch {
            id: obj.compute_id(),
            expected: kind,
            actual: obj.kind,
        });
    }
    bincode::deserialize(&obj.data).map_err(|e| StoreError::CorruptObject {
        id: obj.compute_id(),
        reason: e.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Feature / FeatureType
// ---------------------------------------------------------------------------

/// A typed attribute value.
///
/// Geometry and other domain-specific payloads travel as [`Value::Bytes`];
/// the object model treats them as opaque serializable content.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    Text(String),
    Bytes(Vec<u8>),
}

/// Declared type of an attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeType {
    Bool,
    Int,
    Double,
    Text,
    Bytes,
}

/// One attribute slot in a feature type: name plus declared type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeDescriptor {
    pub name: String,
    pub kind: AttributeType,
}

impl AttributeDescriptor {
    pub fn new(name: impl Into<String>, kind: AttributeType) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Schema descriptor: a name plus an ordered list of attribute descriptors.
///
/// Immutable; features reference their governing type by ID.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureType {
    pub name: String,
    pub attributes: Vec<AttributeDescriptor>,
}

impl FeatureType {
    pub fn new(name: impl Into<String>, attributes: Vec<AttributeDescriptor>) -> Self {
        Self {
            name: name.into(),
            attributes,
        }
    }

    /// The content-addressed ID of this feature type.
    pub fn id(&self) -> ObjectId {
        RevObject::FeatureType(self.clone()).id()
    }
}

/// A single record: an ordered sequence of typed attribute values.
///
/// Values are positional; the governing [`FeatureType`] gives each slot its
/// name and declared type. Immutable once created.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    /// ID of the governing feature type.
    pub feature_type: ObjectId,
    /// Attribute values, positionally aligned with the type's descriptors.
    pub values: Vec<Value>,
}

impl Feature {
    pub fn new(feature_type: ObjectId, values: Vec<Value>) -> Self {
        Self {
            feature_type,
            values,
        }
    }

    /// The content-addressed ID of this feature.
    pub fn id(&self) -> ObjectId {
        RevObject::Feature(self.clone()).id()
    }
}

// ---------------------------------------------------------------------------
// Tree
// ---------------------------------------------------------------------------

/// Kind of entry a tree node points at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Feature,
    Tree,
}

/// A single named entry in a tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Entry name (one path segment).
    pub name: String,
    /// Content-addressed ID of the referenced object.
    pub id: ObjectId,
    /// For feature entries, the ID of the governing feature type.
    /// [`ObjectId::NULL`] when not applicable.
    pub metadata_id: ObjectId,
    /// Whether this entry references a feature or a subtree.
    pub kind: NodeKind,
}

impl Node {
    /// Create a feature entry.
    pub fn feature(name: impl Into<String>, id: ObjectId, metadata_id: ObjectId) -> Self {
        Self {
            name: name.into(),
            id,
            metadata_id,
            kind: NodeKind::Feature,
        }
    }

    /// Create a subtree entry.
    pub fn tree(name: impl Into<String>, id: ObjectId, metadata_id: ObjectId) -> Self {
        Self {
            name: name.into(),
            id,
            metadata_id,
            kind: NodeKind::Tree,
        }
    }
}

impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Node {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.name.cmp(&other.name)
    }
}

/// A versioned index of named child entries.
///
/// A tree is either *leaf-style* (direct entries only, sorted by name) or
/// *bucketed* (a sparse fixed-size array of subordinate tree references,
/// keyed by a slice of the hash of each entry's name) — never a mix of both.
/// Aggregate counts make size queries O(1) regardless of shape.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevTree {
    /// Direct child entries, sorted by name. Empty when bucketed.
    pub entries: Vec<Node>,
    /// Bucket index → subordinate tree ID. Empty when leaf-style.
    pub buckets: BTreeMap<u32, ObjectId>,
    /// Number of feature entries among this tree's direct logical children,
    /// summed across the bucket trie.
    pub size: u64,
    /// Number of named subtree entries among this tree's direct logical
    /// children, summed across the bucket trie.
    pub num_trees: u32,
}

impl RevTree {
    /// The empty tree.
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
            buckets: BTreeMap::new(),
            size: 0,
            num_trees: 0,
        }
    }

    /// Create a leaf-style tree. Entries are sorted by name for
    /// reproducible hashing.
    pub fn leaf(mut entries: Vec<Node>, size: u64, num_trees: u32) -> Self {
        entries.sort();
        Self {
            entries,
            buckets: BTreeMap::new(),
            size,
            num_trees,
        }
    }

    /// Create a bucketed tree from a sparse bucket index.
    pub fn bucketed(buckets: BTreeMap<u32, ObjectId>, size: u64, num_trees: u32) -> Self {
        Self {
            entries: Vec::new(),
            buckets,
            size,
            num_trees,
        }
    }

    /// Returns `true` if this tree has no entries and no buckets.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.buckets.is_empty()
    }

    /// Returns `true` if this tree stores its children as direct entries.
    pub fn is_leaf(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Returns `true` if this tree stores its children behind buckets.
    pub fn is_bucketed(&self) -> bool {
        !self.buckets.is_empty()
    }

    /// Binary search the sorted entry list by name. Leaf trees only.
    pub fn entry(&self, name: &str) -> Option<&Node> {
        self.entries
            .binary_search_by(|n| n.name.as_str().cmp(name))
            .ok()
            .map(|i| &self.entries[i])
    }

    /// The content-addressed ID of this tree.
    pub fn id(&self) -> ObjectId {
        RevObject::Tree(self.clone()).id()
    }
}

// ---------------------------------------------------------------------------
// Commit / Tag
// ---------------------------------------------------------------------------

/// Authorship record: who, when, and in which timezone.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub name: String,
    pub email: String,
    /// Milliseconds since the epoch.
    pub timestamp_ms: i64,
    /// Timezone offset from UTC, in minutes.
    pub tz_offset_minutes: i32,
}

impl Signature {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        timestamp_ms: i64,
        tz_offset_minutes: i32,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            timestamp_ms,
            tz_offset_minutes,
        }
    }
}

/// A snapshot of the whole hierarchy: a root tree plus ancestry.
///
/// Zero parents for the root commit, one for a normal commit, two or more
/// for a merge. The first parent is always "ours" in a merge.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    /// Root tree of the snapshot.
    pub tree: ObjectId,
    /// Parent commit IDs, ours first.
    pub parents: Vec<ObjectId>,
    pub author: Signature,
    pub committer: Signature,
    pub message: String,
}

impl Commit {
    /// First parent, if any.
    pub fn first_parent(&self) -> Option<ObjectId> {
        self.parents.first().copied()
    }

    /// The content-addressed ID of this commit.
    pub fn id(&self) -> ObjectId {
        RevObject::Commit(self.clone()).id()
    }
}

/// A named, annotated pointer to a commit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    /// The commit this tag points at.
    pub target: ObjectId,
    pub message: String,
    pub tagger: Signature,
}

// ---------------------------------------------------------------------------
// RevObject
// ---------------------------------------------------------------------------

/// Any immutable, content-hashed value in the store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum RevObject {
    Feature(Feature),
    FeatureType(FeatureType),
    Tree(RevTree),
    Commit(Commit),
    Tag(Tag),
}

impl RevObject {
    /// The kind discriminant of this object.
    pub fn kind(&self) -> ObjectKind {
        match self {
            Self::Feature(_) => ObjectKind::Feature,
            Self::FeatureType(_) => ObjectKind::FeatureType,
            Self::Tree(_) => ObjectKind::Tree,
            Self::Commit(_) => ObjectKind::Commit,
            Self::Tag(_) => ObjectKind::Tag,
        }
    }

    /// Canonically serialize into a [`StoredObject`].
    ///
    /// The encoding is deterministic: field order follows the struct
    /// definitions, maps are key-ordered, and numbers are fixed-width, so
    /// semantically equal objects always produce identical bytes.
    pub fn to_stored(&self) -> StoreResult<StoredObject> {
        let stored = match self {
            Self::Feature(f) => encode(ObjectKind::Feature, f)?,
            Self::FeatureType(t) => encode(ObjectKind::FeatureType, t)?,
            Self::Tree(t) => encode(ObjectKind::Tree, t)?,
            Self::Commit(c) => encode(ObjectKind::Commit, c)?,
            Self::Tag(t) => encode(ObjectKind::Tag, t)?,
        };
        Ok(stored)
    }

    /// Decode from a [`StoredObject`], checking the kind tag.
    pub fn from_stored(obj: &StoredObject) -> StoreResult<Self> {
        let decoded = match obj.kind {
            ObjectKind::Feature => Self::Feature(decode(obj, ObjectKind::Feature)?),
            ObjectKind::FeatureType => Self::FeatureType(decode(obj, ObjectKind::FeatureType)?),
            ObjectKind::Tree => {
                let tree: RevTree = decode(obj, ObjectKind::Tree)?;
                if !tree.entries.is_empty() && !tree.buckets.is_empty() {
                    return Err(StoreError::CorruptObject {
                        id: obj.compute_id(),
                        reason: "tree mixes direct entries and buckets".into(),
                    });
                }
                Self::Tree(tree)
            }
            ObjectKind::Commit => Self::Commit(decode(obj, ObjectKind::Commit)?),
            ObjectKind::Tag => Self::Tag(decode(obj, ObjectKind::Tag)?),
        };
        Ok(decoded)
    }

    /// The content-addressed ID of this object.
    ///
    /// Pure function of the canonical serialization; objects of different
    /// kinds never share an ID.
    pub fn id(&self) -> ObjectId {
        // Encoding an in-memory object is infallible: every field is a
        // plain owned value with a total serialize impl.
        self.to_stored()
            .expect("canonical encoding of an in-memory object")
            .compute_id()
    }

    /// Unwrap as a tree, or fail with [`StoreError::TypeMismatch`].
    pub fn into_tree(self) -> StoreResult<RevTree> {
        match self {
            Self::Tree(t) => Ok(t),
            other => Err(type_mismatch(&other, ObjectKind::Tree)),
        }
    }

    /// Unwrap as a commit, or fail with [`StoreError::TypeMismatch`].
    pub fn into_commit(self) -> StoreResult<Commit> {
        match self {
            Self::Commit(c) => Ok(c),
            other => Err(type_mismatch(&other, ObjectKind::Commit)),
        }
    }

    /// Unwrap as a feature, or fail with [`StoreError::TypeMismatch`].
    pub fn into_feature(self) -> StoreResult<Feature> {
        match self {
            Self::Feature(f) => Ok(f),
            other => Err(type_mismatch(&other, ObjectKind::Feature)),
        }
    }

    /// Unwrap as a feature type, or fail with [`StoreError::TypeMismatch`].
    pub fn into_feature_type(self) -> StoreResult<FeatureType> {
        match self {
            Self::FeatureType(t) => Ok(t),
            other => Err(type_mismatch(&other, ObjectKind::FeatureType)),
        }
    }
}

fn type_mismatch(obj: &RevObject, expected: ObjectKind) -> StoreError {
    StoreError::TypeMismatch {
        id: obj.id(),
        expected,
        actual: obj.kind(),
    }
}
