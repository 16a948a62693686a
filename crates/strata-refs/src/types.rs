//! Core reference types.
//!
//! References are named pointers into the commit graph. A ref is either
//! *direct* (it carries an object id) or *symbolic* (it names another ref,
//! the way `HEAD` names the current branch).

use serde::{Deserialize, Serialize};
use strata_types::ObjectId;

/// The symbolic ref naming the current branch.
pub const HEAD: &str = "HEAD";

/// Transient ref recording the commit being merged in. Present only while a
/// conflicted merge is in progress.
pub const MERGE_HEAD: &str = "MERGE_HEAD";

/// Transient ref recording the pre-merge position of the current branch.
pub const ORIG_HEAD: &str = "ORIG_HEAD";

/// Ref pointing at the staged root tree during a no-commit merge.
pub const STAGE_HEAD: &str = "STAGE_HEAD";

/// Ref pointing at the working root tree during a no-commit merge.
pub const WORK_HEAD: &str = "WORK_HEAD";

/// Namespace prefix for branch refs.
pub const HEADS_PREFIX: &str = "refs/heads/";

/// Namespace prefix for tag refs.
pub const TAGS_PREFIX: &str = "refs/tags/";

/// Canonical ref name for a branch (e.g. `refs/heads/main`).
pub fn branch_ref(name: &str) -> String {
    format!("{HEADS_PREFIX}{name}")
}

/// Canonical ref name for a tag (e.g. `refs/tags/v1.0`).
pub fn tag_ref(name: &str) -> String {
    format!("{TAGS_PREFIX}{name}")
}

/// Short name of a branch or tag ref, if it lives in one of the two
/// namespaces. Returns `None` for top-level refs like `HEAD`.
pub fn short_name(canonical: &str) -> Option<&str> {
    canonical
        .strip_prefix(HEADS_PREFIX)
        .or_else(|| canonical.strip_prefix(TAGS_PREFIX))
}

/// A named reference in the repository.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Ref {
    /// Points directly at an object (commit for branches, tag object or
    /// commit for tags, root tree for the stage/work refs).
    Direct(ObjectId),

    /// Points at another ref by canonical name. `HEAD` is symbolic to the
    /// current branch even before that branch has its first commit.
    Symbolic(String),
}

impl Ref {
    /// The target object id, if this is a direct ref.
    pub fn target(&self) -> Option<ObjectId> {
        match self {
            Ref::Direct(id) => Some(*id),
            Ref::Symbolic(_) => None,
        }
    }

    /// Returns `true` if this ref names another ref rather than an object.
    pub fn is_symbolic(&self) -> bool {
        matches!(self, Ref::Symbolic(_))
    }
}
