//! The merge operation.
//!
//! Merges one or more commits into a target branch using three-way combining
//! over tree diffs. Each pairwise step diffs base→ours and base→theirs and
//! folds theirs' changes into the evolving result; paths where both sides
//! diverge go through the attribute-level feature merge before being declared
//! conflicts. A conflicted two-way merge persists its conflict set and leaves
//! the repository in a merging state; a conflicted octopus merge fails
//! outright without touching any state.

use std::collections::HashMap;

use tracing::{debug, info};

use strata_diff::{diff_trees, DiffEntry};
use strata_graph::CommitGraph;
use strata_refs::{
    Conflict, ConflictStore, Ref, RefStore, MERGE_HEAD, ORIG_HEAD, STAGE_HEAD, WORK_HEAD,
};
use strata_store::{Commit, Node, NodeKind, ObjectStore, RevObject, RevTree, Signature};
use strata_tree::{apply_edits, PathEdit};
use strata_types::ObjectId;

use crate::error::{MergeError, Result};
use crate::feature_merge::{merge_features, FeatureMergeOutcome};

/// Everything a merge needs beyond the stores: which commits to bring in,
/// conflict policy, and authorship for the resulting commit.
#[derive(Clone, Debug)]
pub struct MergeRequest {
    /// Commits to merge into the target branch, in parent order.
    pub theirs: Vec<ObjectId>,
    /// Resolve every conflict by keeping the target branch's value.
    pub use_ours: bool,
    /// Resolve every conflict by taking the incoming value.
    pub use_theirs: bool,
    /// Stage the merged tree without creating a commit or moving the branch.
    pub no_commit: bool,
    pub author: Signature,
    pub committer: Signature,
    /// Commit message; a default is derived from the merged ids when absent.
    pub message: Option<String>,
}

impl MergeRequest {
    pub fn new(theirs: Vec<ObjectId>, author: Signature) -> Self {
        Self {
            theirs,
            use_ours: false,
            use_theirs: false,
            no_commit: false,
            committer: author.clone(),
            author,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn use_ours(mut self) -> Self {
        self.use_ours = true;
        self
    }

    pub fn use_theirs(mut self) -> Self {
        self.use_theirs = true;
        self
    }

    pub fn no_commit(mut self) -> Self {
        self.no_commit = true;
        self
    }
}

/// Successful result of a merge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The branch was an ancestor of the incoming commit and simply advanced;
    /// no new commit was created.
    FastForward { commit: ObjectId },
    /// A merge commit was created and the branch advanced to it.
    Merged { commit: ObjectId, tree: ObjectId },
    /// The merged tree was staged without committing (`no_commit`); the
    /// transient merge refs are left set so the merge can be finished or
    /// aborted later.
    Staged { tree: ObjectId },
}

/// The merge engine. Holds its collaborators by reference; each call to
/// [`run`](MergeOp::run) is one complete merge attempt.
pub struct MergeOp<'a> {
    store: &'a dyn ObjectStore,
    refs: &'a dyn RefStore,
    conflicts: &'a dyn ConflictStore,
}

impl<'a> MergeOp<'a> {
    pub fn new(
        store: &'a dyn ObjectStore,
        refs: &'a dyn RefStore,
        conflicts: &'a dyn ConflictStore,
    ) -> Self {
        Self {
            store,
            refs,
            conflicts,
        }
    }

    /// Merge the requested commits into the branch at `target_ref` (a
    /// canonical ref name such as `refs/heads/main`).
    ///
    /// On a conflicted two-way merge this returns
    /// [`MergeError::MergeConflict`] after persisting the conflict set,
    /// setting `ORIG_HEAD`/`MERGE_HEAD`, and staging the partially merged
    /// tree. All validation failures are reported before any mutation.
    pub fn run(&self, target_ref: &str, request: &MergeRequest) -> Result<MergeOutcome> {
        if request.use_ours && request.use_theirs {
            return Err(MergeError::ConfigurationError(
                "cannot use both ours and theirs strategies".into(),
            ));
        }
        if request.theirs.is_empty() {
            return Err(MergeError::ConfigurationError(
                "no commits specified to merge".into(),
            ));
        }
        if !self.conflicts.is_empty()? {
            return Err(MergeError::ConflictsUnresolved);
        }

        let ours = self.refs.resolve(target_ref)?.ok_or_else(|| {
            MergeError::ConfigurationError(format!("target ref has no commits: {target_ref}"))
        })?;
        let graph = CommitGraph::new(self.store);

        // Two-commit shortcuts: already merged, or a pure fast-forward.
        if let [theirs] = request.theirs[..] {
            if graph.is_ancestor(&theirs, &ours)? {
                return Err(MergeError::NothingToMerge);
            }
            if graph.is_ancestor(&ours, &theirs)? {
                return self.fast_forward(target_ref, ours, theirs, request);
            }
        }

        let ours_commit = self.store.get_commit(&ours)?;
        let mut evolving = self.store.get_tree(&ours_commit.tree)?;
        let mut conflicts: Vec<Conflict> = Vec::new();

        for theirs in &request.theirs {
            let base = graph.merge_base(&ours, theirs)?;
            let base_tree = match base {
                Some(base_commit) => self.store.get_commit(&base_commit)?.tree,
                // Disjoint histories merge against the empty tree.
                None => ObjectId::NULL,
            };
            debug!(
                theirs = %theirs.short_hex(),
                base = %base_tree.short_hex(),
                "merge step"
            );

            let theirs_tree = self.store.get_commit(theirs)?.tree;
            let (edits, step_conflicts) =
                self.combine(&base_tree, &evolving, &theirs_tree, request)?;

            if !step_conflicts.is_empty() && request.theirs.len() > 1 {
                return Err(MergeError::IllegalMerge);
            }

            evolving = apply_edits(self.store, &evolving, edits)?;
            conflicts.extend(step_conflicts);
        }

        let merged_tree = evolving.id();

        if !conflicts.is_empty() {
            let count = conflicts.len();
            info!(count, "merge stopped on conflicts");
            self.refs.force_set(ORIG_HEAD, Ref::Direct(ours))?;
            self.refs
                .force_set(MERGE_HEAD, Ref::Direct(request.theirs[0]))?;
            self.refs.force_set(STAGE_HEAD, Ref::Direct(merged_tree))?;
            self.refs.force_set(WORK_HEAD, Ref::Direct(merged_tree))?;
            self.conflicts.write_all(conflicts)?;
            return Err(MergeError::MergeConflict { count });
        }

        if request.no_commit {
            self.refs.force_set(ORIG_HEAD, Ref::Direct(ours))?;
            self.refs
                .force_set(MERGE_HEAD, Ref::Direct(request.theirs[0]))?;
            self.refs.force_set(STAGE_HEAD, Ref::Direct(merged_tree))?;
            self.refs.force_set(WORK_HEAD, Ref::Direct(merged_tree))?;
            return Ok(MergeOutcome::Staged { tree: merged_tree });
        }

        let mut parents = Vec::with_capacity(1 + request.theirs.len());
        parents.push(ours);
        parents.extend(request.theirs.iter().copied());

        let message = request.message.clone().unwrap_or_else(|| {
            let ids: Vec<String> = request.theirs.iter().map(|id| id.short_hex()).collect();
            format!("Merge commit(s) {}", ids.join(", "))
        });
        let commit = Commit {
            tree: merged_tree,
            parents,
            author: request.author.clone(),
            committer: request.committer.clone(),
            message,
        };
        let commit_id = self.store.put(&RevObject::Commit(commit))?;

        self.refs.compare_and_set(
            target_ref,
            Some(&Ref::Direct(ours)),
            Some(Ref::Direct(commit_id)),
        )?;
        self.clear_merge_refs()?;
        info!(commit = %commit_id.short_hex(), "merge committed");

        Ok(MergeOutcome::Merged {
            commit: commit_id,
            tree: merged_tree,
        })
    }

    fn fast_forward(
        &self,
        target_ref: &str,
        ours: ObjectId,
        theirs: ObjectId,
        request: &MergeRequest,
    ) -> Result<MergeOutcome> {
        let theirs_tree = self.store.get_commit(&theirs)?.tree;
        if request.no_commit {
            self.refs.force_set(ORIG_HEAD, Ref::Direct(ours))?;
            self.refs.force_set(MERGE_HEAD, Ref::Direct(theirs))?;
            self.refs.force_set(STAGE_HEAD, Ref::Direct(theirs_tree))?;
            self.refs.force_set(WORK_HEAD, Ref::Direct(theirs_tree))?;
            return Ok(MergeOutcome::Staged { tree: theirs_tree });
        }

        self.refs.compare_and_set(
            target_ref,
            Some(&Ref::Direct(ours)),
            Some(Ref::Direct(theirs)),
        )?;
        info!(commit = %theirs.short_hex(), "fast-forward");
        Ok(MergeOutcome::FastForward { commit: theirs })
    }

    /// One pairwise three-way combine: fold theirs' changes from the base
    /// into edits against the evolving ours-side tree, collecting conflicts
    /// for the paths that cannot be reconciled.
    fn combine(
        &self,
        base_tree: &ObjectId,
        evolving: &RevTree,
        theirs_tree: &ObjectId,
        request: &MergeRequest,
    ) -> Result<(Vec<PathEdit>, Vec<Conflict>)> {
        let evolving_id = evolving.id();
        let mut ours_changes: HashMap<String, DiffEntry> = HashMap::new();
        for entry in diff_trees(self.store, base_tree, &evolving_id) {
            let entry = entry?;
            ours_changes.insert(entry.path.clone(), entry);
        }

        let mut edits = Vec::new();
        let mut conflicts = Vec::new();

        for entry in diff_trees(self.store, base_tree, theirs_tree) {
            let theirs_entry = entry?;
            match ours_changes.get(&theirs_entry.path) {
                // Untouched on our side: take theirs.
                None => edits.push(take_theirs(&theirs_entry)),
                // Identical change on both sides (including both deleting).
                Some(ours_entry) if ours_entry.new == theirs_entry.new => {}
                Some(ours_entry) => {
                    if request.use_ours {
                        continue;
                    }
                    if request.use_theirs {
                        edits.push(take_theirs(&theirs_entry));
                        continue;
                    }
                    match self.try_feature_merge(ours_entry, &theirs_entry)? {
                        Some(edit) => edits.push(edit),
                        None => conflicts.push(Conflict::new(
                            theirs_entry.path.clone(),
                            ours_entry.new_id(),
                            theirs_entry.new_id(),
                        )),
                    }
                }
            }
        }

        Ok((edits, conflicts))
    }

    /// Attempt the attribute-level merge for a path both sides modified.
    /// Returns the edit installing the merged feature, or `None` when the
    /// divergence is not feature-mergeable (deletions, non-feature entries,
    /// no base version, or overlapping attribute edits).
    fn try_feature_merge(
        &self,
        ours_entry: &DiffEntry,
        theirs_entry: &DiffEntry,
    ) -> Result<Option<PathEdit>> {
        let (Some(base_node), Some(ours_node), Some(theirs_node)) =
            (&theirs_entry.old, &ours_entry.new, &theirs_entry.new)
        else {
            return Ok(None);
        };
        if base_node.kind != NodeKind::Feature
            || ours_node.kind != NodeKind::Feature
            || theirs_node.kind != NodeKind::Feature
        {
            return Ok(None);
        }

        let base = self.store.get_feature(&base_node.id)?;
        let ours = self.store.get_feature(&ours_node.id)?;
        let theirs = self.store.get_feature(&theirs_node.id)?;

        match merge_features(&base, &ours, &theirs) {
            FeatureMergeOutcome::Conflict => Ok(None),
            FeatureMergeOutcome::Merged(merged) => {
                let id = self.store.put(&RevObject::Feature(merged))?;
                let node = Node::feature(ours_node.name.clone(), id, ours_node.metadata_id);
                Ok(Some(PathEdit::put(theirs_entry.path.clone(), node)))
            }
        }
    }

    /// Remove the transient merge refs after a completed or abandoned merge.
    pub fn clear_merge_refs(&self) -> Result<()> {
        for name in [ORIG_HEAD, MERGE_HEAD, STAGE_HEAD, WORK_HEAD] {
            self.refs.force_delete(name)?;
        }
        Ok(())
    }
}

/// The edit that installs theirs' version of a path.
fn take_theirs(entry: &DiffEntry) -> PathEdit {
    match &entry.new {
        Some(node) => PathEdit::put(entry.path.clone(), node.clone()),
        None => PathEdit::remove(entry.path.clone()),
    }
}
