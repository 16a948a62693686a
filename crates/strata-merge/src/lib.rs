//! Three-way merge engine for Strata.
//!
//! Combines one or more commits into a target branch. For each incoming
//! commit the engine computes the merge base, diffs base→ours and
//! base→theirs, and folds theirs' changes into the evolving result tree.
//! Paths changed on both sides go through an attribute-level feature merge
//! before being declared conflicts, so co-edited records only conflict when
//! the same attribute diverged.
//!
//! Outcomes:
//!
//! - Fast-forward when the branch is an ancestor of the incoming commit
//! - A merge commit with parents `[ours, theirs...]` when combining succeeds
//! - A persisted conflict set plus transient `MERGE_HEAD`/`ORIG_HEAD` refs
//!   when a two-way merge conflicts
//! - [`MergeError::IllegalMerge`] when an octopus merge hits any conflict
//!
//! # Key Types
//!
//! - [`MergeOp`] — the engine; one [`run`](MergeOp::run) per merge attempt
//! - [`MergeRequest`] — commits to merge, policy flags, authorship
//! - [`MergeOutcome`] — fast-forward, merged, or staged

pub mod error;
pub mod feature_merge;
pub mod op;

pub use error::{MergeError, Result};
pub use feature_merge::{merge_features, FeatureMergeOutcome};
pub use op::{MergeOp, MergeOutcome, MergeRequest};
