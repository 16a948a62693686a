//! Revision object model and content-addressed storage for Strata.
//!
//! This crate defines the immutable object graph — features, feature types,
//! trees, commits and tags — together with the canonical serialization that
//! serves as each object's hash preimage, and the [`ObjectStore`] contract
//! they are persisted through.
//!
//! # Object Types
//!
//! - [`Feature`] — ordered, typed attribute values for one record
//! - [`FeatureType`] — schema descriptor: attribute names and types
//! - [`RevTree`] — index of named child entries, flat or hash-bucketed
//! - [`Commit`] — root tree reference, parent commits, authorship, message
//! - [`Tag`] — named pointer to a commit with its own message
//!
//! # Design Rules
//!
//! 1. Objects are immutable once written (content-addressing guarantees this).
//! 2. The object's ID is a pure function of its canonical serialized form:
//!    two semantically equal objects always serialize identically.
//! 3. Writes are idempotent. Concurrent writers racing to insert the same
//!    content is a no-op collision, never an error.
//! 4. Concurrent reads are always safe (objects are immutable).
//! 5. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod memory;
pub mod object;
pub mod traits;

// Re-export primary types at crate root for ergonomic imports.
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryObjectStore;
pub use object::{
    AttributeDescriptor, AttributeType, Commit, Feature, FeatureType, Node, NodeKind, ObjectKind,
    RevObject, RevTree, Signature, StoredObject, Tag, Value,
};
pub use traits::ObjectStore;
