//! Reference and conflict state for Strata.
//!
//! This crate provides the mutable edge of an otherwise immutable repository:
//! named refs pointing into the commit graph, and the persisted conflict set
//! of an in-progress merge.
//!
//! # Architecture
//!
//! - **Branches** (`refs/heads/*`) are mutable pointers to commits. They only
//!   move through [`RefStore::compare_and_set`], so a stale writer fails with
//!   [`RefError::ConcurrentModification`] instead of silently clobbering a
//!   concurrent update.
//! - **HEAD** is symbolic to the current branch, which lets it track an
//!   unborn branch before the first commit.
//! - **Transient merge refs** (`MERGE_HEAD`, `ORIG_HEAD`, `STAGE_HEAD`,
//!   `WORK_HEAD`) record merge-in-progress state and are removed when the
//!   merge is committed or aborted.
//! - **Conflicts** are stored per path and survive across sessions until
//!   resolved or cleared.
//!
//! # Modules
//!
//! - [`error`] — Error types for ref operations
//! - [`types`] — [`Ref`] plus well-known ref names
//! - [`traits`] — The [`RefStore`] trait
//! - [`names`] — Branch/tag name validation
//! - [`conflicts`] — [`Conflict`] and the [`ConflictStore`] trait
//! - [`memory`] — In-memory stores for tests

pub mod conflicts;
pub mod error;
pub mod memory;
pub mod names;
pub mod traits;
pub mod types;

pub use conflicts::{Conflict, ConflictStore};
pub use error::{RefError, Result};
pub use memory::{InMemoryConflictStore, InMemoryRefStore};
pub use names::{validate_branch_name, validate_tag_name};
pub use traits::RefStore;
pub use types::{
    branch_ref, short_name, tag_ref, Ref, HEAD, HEADS_PREFIX, MERGE_HEAD, ORIG_HEAD, STAGE_HEAD,
    TAGS_PREFIX, WORK_HEAD,
};
