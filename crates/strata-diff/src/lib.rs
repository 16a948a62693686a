//! Tree differencing for Strata.
//!
//! Walks two trees in locked step and produces a lazy sequence of per-path
//! change records. The key performance property is the structural-sharing
//! short-circuit: whenever both sides reference the same tree id, the whole
//! subtree is skipped in O(1) without descending, so unchanged portions of
//! arbitrarily large collections cost nothing.
//!
//! # Key Types
//!
//! - [`DiffEntry`] — one change record: path plus the old and/or new entry
//! - [`TreeDiffIter`] — the lazy, restartable iterator over change records

pub mod error;
pub mod tree_diff;

pub use error::{DiffError, DiffResult};
pub use tree_diff::{diff_trees, ChangeKind, DiffEntry, TreeDiffIter};
