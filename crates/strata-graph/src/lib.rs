//! Commit graph navigation for Strata.
//!
//! The commit graph is implicit in commit parent links; nothing is indexed
//! ahead of time. [`CommitGraph`] loads commits from the object store on
//! demand and answers ancestry queries, computes merge bases, and iterates
//! history in either first-parent or full topological order.

pub mod error;
pub mod graph;

pub use error::{GraphError, GraphResult};
pub use graph::{CommitGraph, HistoryIter, HistoryOrder};
