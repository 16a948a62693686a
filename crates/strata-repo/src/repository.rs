//! The repository facade.
//!
//! Wires the object store, ref store, conflict store, and config together
//! behind one API: init, commit, branch, checkout, tag, merge, and history.
//! Collaborators are passed explicitly to the lower layers; there is no
//! global registry.

use std::time::{SystemTime, UNIX_EPOCH};

use tracing::info;

use strata_diff::{diff_trees, DiffEntry};
use strata_graph::{CommitGraph, HistoryOrder};
use strata_merge::{MergeOp, MergeOutcome, MergeRequest};
use strata_refs::{
    branch_ref, tag_ref, ConflictStore, InMemoryConflictStore, InMemoryRefStore, Ref, RefStore,
    HEAD, MERGE_HEAD, ORIG_HEAD, STAGE_HEAD, WORK_HEAD,
};
use strata_store::{
    Commit, InMemoryObjectStore, ObjectStore, RevObject, RevTree, Signature, Tag,
};
use strata_tree::{apply_edits, find_path, NodeRef};
use strata_types::ObjectId;

use crate::commit::CommitProposal;
use crate::config::Config;
use crate::error::{RepoError, Result};

/// The default branch created by [`Repository::init`].
pub const DEFAULT_BRANCH: &str = "main";

/// A versioned feature repository backed by in-memory stores.
pub struct Repository {
    store: InMemoryObjectStore,
    refs: InMemoryRefStore,
    conflicts: InMemoryConflictStore,
    config: Config,
}

impl Repository {
    /// Initialize an empty repository with `HEAD` on an unborn `main`.
    pub fn init() -> Result<Self> {
        let repo = Self {
            store: InMemoryObjectStore::new(),
            refs: InMemoryRefStore::new(),
            conflicts: InMemoryConflictStore::new(),
            config: Config::new(),
        };
        repo.refs
            .force_set(HEAD, Ref::Symbolic(branch_ref(DEFAULT_BRANCH)))?;
        Ok(repo)
    }

    pub fn store(&self) -> &InMemoryObjectStore {
        &self.store
    }

    pub fn refs(&self) -> &InMemoryRefStore {
        &self.refs
    }

    pub fn conflicts(&self) -> &InMemoryConflictStore {
        &self.conflicts
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    // ---- State queries ----

    /// Canonical ref name of the current branch (e.g. `refs/heads/main`).
    pub fn current_branch(&self) -> Result<String> {
        self.refs
            .symbolic_target(HEAD)?
            .ok_or(RepoError::DetachedHead)
    }

    /// The commit `HEAD` resolves to, or `None` on an unborn branch.
    pub fn head_commit(&self) -> Result<Option<ObjectId>> {
        Ok(self.refs.resolve(HEAD)?)
    }

    /// The root tree at `HEAD`; the empty tree on an unborn branch.
    pub fn head_tree(&self) -> Result<RevTree> {
        match self.head_commit()? {
            Some(commit) => Ok(self.store.get_tree(&self.store.get_commit(&commit)?.tree)?),
            None => Ok(RevTree::empty()),
        }
    }

    /// Look up the entry at `path` in the `HEAD` tree.
    pub fn find(&self, path: &str) -> Result<Option<NodeRef>> {
        let tree = self.head_tree()?;
        Ok(find_path(&self.store, &tree, path)?)
    }

    /// Returns `true` while a conflicted or staged merge is in progress.
    pub fn merging(&self) -> Result<bool> {
        Ok(self.refs.read_ref(MERGE_HEAD)?.is_some() || !self.conflicts.is_empty()?)
    }

    // ---- Commit ----

    /// Apply a proposal's edits on top of the current branch tip and commit
    /// the result, advancing the branch.
    ///
    /// Fails with [`RepoError::ConflictsUnresolved`] while merge conflicts
    /// are outstanding. When `MERGE_HEAD` is set (conflicts all resolved, or
    /// a merge staged with `no_commit`), the new commit concludes that merge:
    /// it gets `MERGE_HEAD` as its second parent and the transient merge
    /// state is cleared.
    pub fn commit(&self, proposal: CommitProposal) -> Result<ObjectId> {
        if !self.conflicts.is_empty()? {
            return Err(RepoError::ConflictsUnresolved);
        }

        let branch = self.current_branch()?;
        let tip = self.refs.resolve(&branch)?;
        let base_tree = match tip {
            Some(commit) => self.store.get_tree(&self.store.get_commit(&commit)?.tree)?,
            None => RevTree::empty(),
        };

        let new_tree = apply_edits(&self.store, &base_tree, proposal.edits)?;
        let merge_head = self.refs.resolve(MERGE_HEAD)?;

        if new_tree.id() == base_tree.id() && merge_head.is_none() && !proposal.allow_empty {
            return Err(RepoError::NothingToCommit);
        }

        let author = self.signature(proposal.author)?;
        let committer = match proposal.committer {
            Some(committer) => committer,
            None => author.clone(),
        };

        let mut parents = Vec::new();
        parents.extend(tip);
        parents.extend(merge_head);

        let commit = Commit {
            tree: new_tree.id(),
            parents,
            author,
            committer,
            message: proposal.message,
        };
        let commit_id = self.store.put(&RevObject::Commit(commit))?;

        let expected = tip.map(Ref::Direct);
        self.refs
            .compare_and_set(&branch, expected.as_ref(), Some(Ref::Direct(commit_id)))?;

        if merge_head.is_some() {
            self.clear_merge_state()?;
        }
        info!(commit = %commit_id.short_hex(), branch = %branch, "committed");
        Ok(commit_id)
    }

    // ---- Branches and tags ----

    /// Create a branch at the current `HEAD` commit.
    pub fn branch(&self, name: &str) -> Result<()> {
        let tip = self.head_commit()?.ok_or(RepoError::UnbornBranch)?;
        self.refs
            .compare_and_set(&branch_ref(name), None, Some(Ref::Direct(tip)))?;
        Ok(())
    }

    /// Point `HEAD` at an existing branch.
    pub fn checkout(&self, name: &str) -> Result<()> {
        let canonical = branch_ref(name);
        if self.refs.read_ref(&canonical)?.is_none() {
            return Err(RepoError::UnknownBranch {
                name: name.to_string(),
            });
        }
        self.refs.force_set(HEAD, Ref::Symbolic(canonical))?;
        Ok(())
    }

    /// Delete a branch. The current branch cannot be deleted.
    pub fn delete_branch(&self, name: &str) -> Result<bool> {
        let canonical = branch_ref(name);
        if self.current_branch()? == canonical {
            return Err(RepoError::CannotDeleteCurrentBranch {
                name: name.to_string(),
            });
        }
        Ok(self.refs.force_delete(&canonical)?)
    }

    /// Create an annotated tag at the current `HEAD` commit. Tags are
    /// immutable: a second tag with the same name is rejected.
    pub fn tag(&self, name: &str, message: &str) -> Result<ObjectId> {
        let target = self.head_commit()?.ok_or(RepoError::UnbornBranch)?;
        let tag = Tag {
            name: name.to_string(),
            target,
            message: message.to_string(),
            tagger: self.signature(None)?,
        };
        let tag_id = self.store.put(&RevObject::Tag(tag))?;
        self.refs
            .compare_and_set(&tag_ref(name), None, Some(Ref::Direct(tag_id)))?;
        Ok(tag_id)
    }

    // ---- Merge ----

    /// Merge the given commits into the current branch with default options.
    pub fn merge(&self, theirs: Vec<ObjectId>) -> Result<MergeOutcome> {
        self.merge_with(theirs, |request| request)
    }

    /// Merge with request customization (strategy flags, message, no-commit).
    pub fn merge_with(
        &self,
        theirs: Vec<ObjectId>,
        configure: impl FnOnce(MergeRequest) -> MergeRequest,
    ) -> Result<MergeOutcome> {
        let branch = self.current_branch()?;
        let request = configure(MergeRequest::new(theirs, self.signature(None)?));
        let op = MergeOp::new(&self.store, &self.refs, &self.conflicts);
        Ok(op.run(&branch, &request)?)
    }

    /// Abandon an in-progress merge: drop the conflict set and the transient
    /// merge refs. The branch tip never moved, so nothing else resets.
    pub fn abort_merge(&self) -> Result<()> {
        if !self.merging()? {
            return Err(RepoError::NoMergeInProgress);
        }
        self.clear_merge_state()?;
        info!("merge aborted");
        Ok(())
    }

    /// Mark a conflicted path as resolved, dropping it from the conflict
    /// set. The caller supplies the resolved content as an edit on the
    /// concluding commit. Returns `false` if the path was not conflicted.
    pub fn resolve_conflict(&self, path: &str) -> Result<bool> {
        Ok(self.conflicts.remove(path)?)
    }

    fn clear_merge_state(&self) -> Result<()> {
        self.conflicts.clear()?;
        for name in [ORIG_HEAD, MERGE_HEAD, STAGE_HEAD, WORK_HEAD] {
            self.refs.force_delete(name)?;
        }
        Ok(())
    }

    // ---- History ----

    /// Commits reachable from `HEAD` in the requested order.
    pub fn log(&self, order: HistoryOrder) -> Result<Vec<(ObjectId, Commit)>> {
        let tip = self.head_commit()?.ok_or(RepoError::UnbornBranch)?;
        let graph = CommitGraph::new(&self.store);
        let mut commits = Vec::new();
        for item in graph.history(tip, order) {
            commits.push(item?);
        }
        Ok(commits)
    }

    pub fn is_ancestor(&self, ancestor: &ObjectId, descendant: &ObjectId) -> Result<bool> {
        Ok(CommitGraph::new(&self.store).is_ancestor(ancestor, descendant)?)
    }

    pub fn merge_base(&self, a: &ObjectId, b: &ObjectId) -> Result<Option<ObjectId>> {
        Ok(CommitGraph::new(&self.store).merge_base(a, b)?)
    }

    /// All feature-level changes between two commits.
    pub fn diff_commits(&self, old: &ObjectId, new: &ObjectId) -> Result<Vec<DiffEntry>> {
        let old_tree = self.store.get_commit(old)?.tree;
        let new_tree = self.store.get_commit(new)?.tree;
        let mut changes = Vec::new();
        for entry in diff_trees(&self.store, &old_tree, &new_tree) {
            changes.push(entry?);
        }
        Ok(changes)
    }

    // ---- Internal ----

    fn signature(&self, explicit: Option<Signature>) -> Result<Signature> {
        match explicit {
            Some(signature) => Ok(signature),
            None => self
                .config
                .signature(now_ms(), 0)
                .ok_or(RepoError::MissingIdentity),
        }
    }
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or_default()
}
