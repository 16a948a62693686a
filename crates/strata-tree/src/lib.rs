//! Tree indexing for Strata.
//!
//! Maps a conceptually flat, ordered collection of named entries onto the
//! two-tier representation stored in [`strata_store::RevTree`]: small
//! collections are a single sorted leaf, large collections are split into a
//! fixed number of hash-bucketed subtrees, recursively, producing a balanced
//! trie keyed by the hash of each entry's name.
//!
//! # Key Types
//!
//! - [`TreeBuilder`] — builds and edits trees copy-on-write; only the path
//!   from the root to a changed leaf is rewritten
//! - [`TreeWalker`] — lazy depth-first enumeration of a tree's entries
//! - [`find_path`] — single-path lookup from a root tree
//!
//! # Counts
//!
//! Each tree records the number of feature entries and named subtree entries
//! that are its *direct* logical children (summed across its bucket trie, so
//! the counts stay O(1) to combine during builds). Deep totals descend named
//! subtrees through [`total_size`].

pub mod bucket;
pub mod builder;
pub mod error;
pub mod walk;

pub use bucket::{bucket_index, BUCKET_COUNT, DEFAULT_LEAF_THRESHOLD, MAX_BUCKET_DEPTH};
pub use builder::{apply_edits, apply_edits_with_threshold, PathEdit, TreeBuilder};
pub use error::{TreeError, TreeResult};
pub use walk::{find_path, total_size, trie_children, NodeRef, TreeWalker, WalkStrategy};
