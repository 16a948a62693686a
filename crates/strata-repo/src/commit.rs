//! Commit proposals.
//!
//! A [`CommitProposal`] collects everything a commit needs before the
//! repository applies it: the tree edits, the message, and optional
//! authorship overrides (defaults come from [`Config`](crate::Config)).

use strata_store::{Node, Signature};
use strata_tree::PathEdit;

/// A pending commit, built up before being applied by
/// [`Repository::commit`](crate::Repository::commit).
#[derive(Clone, Debug)]
pub struct CommitProposal {
    pub message: String,
    /// Tree edits relative to the current branch tip.
    pub edits: Vec<PathEdit>,
    pub author: Option<Signature>,
    pub committer: Option<Signature>,
    /// Create the commit even when the tree is unchanged.
    pub allow_empty: bool,
}

impl CommitProposal {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            edits: Vec::new(),
            author: None,
            committer: None,
            allow_empty: false,
        }
    }

    /// Install (create or replace) an entry at `path`.
    pub fn put(mut self, path: impl Into<String>, node: Node) -> Self {
        self.edits.push(PathEdit::put(path, node));
        self
    }

    /// Remove the entry at `path`.
    pub fn remove(mut self, path: impl Into<String>) -> Self {
        self.edits.push(PathEdit::remove(path));
        self
    }

    pub fn with_author(mut self, author: Signature) -> Self {
        self.author = Some(author);
        self
    }

    pub fn with_committer(mut self, committer: Signature) -> Self {
        self.committer = Some(committer);
        self
    }

    pub fn allow_empty(mut self) -> Self {
        self.allow_empty = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_types::ObjectId;

    #[test]
    fn proposal_builder_collects_edits() {
        let node = Node::feature("f1", ObjectId::from_bytes(b"f1"), ObjectId::NULL);
        let proposal = CommitProposal::new("add and drop")
            .put("points/f1", node)
            .remove("points/f2")
            .allow_empty();

        assert_eq!(proposal.edits.len(), 2);
        assert!(proposal.edits[0].node.is_some());
        assert!(proposal.edits[1].node.is_none());
        assert!(proposal.allow_empty);
        assert!(proposal.author.is_none());
    }
}
