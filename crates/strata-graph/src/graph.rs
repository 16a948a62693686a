//! Ancestry, merge-base and log traversal over the commit graph.

use std::collections::{HashMap, HashSet, VecDeque};

use strata_store::{Commit, ObjectStore};
use strata_types::ObjectId;
use tracing::debug;

use crate::error::GraphResult;

/// Navigator over the commit graph stored in an [`ObjectStore`].
pub struct CommitGraph<'a> {
    store: &'a dyn ObjectStore,
}

impl<'a> CommitGraph<'a> {
    pub fn new(store: &'a dyn ObjectStore) -> Self {
        Self { store }
    }

    /// Is `ancestor` reachable from `descendant` by following parent links?
    ///
    /// Reflexive: a commit is its own ancestor. Breadth-first with a
    /// memoized visited set, so merge commits do not cause exponential
    /// re-walks.
    pub fn is_ancestor(&self, ancestor: &ObjectId, descendant: &ObjectId) -> GraphResult<bool> {
        if ancestor == descendant {
            return Ok(true);
        }
        let mut visited = HashSet::new();
        visited.insert(*descendant);
        let mut queue = VecDeque::new();
        queue.push_back(*descendant);

        while let Some(id) = queue.pop_front() {
            let commit = self.store.get_commit(&id)?;
            for parent in &commit.parents {
                if parent == ancestor {
                    return Ok(true);
                }
                if visited.insert(*parent) {
                    queue.push_back(*parent);
                }
            }
        }
        Ok(false)
    }

    /// Lowest common ancestor of two commits.
    ///
    /// Expands the ancestor frontiers of both inputs alternately, one commit
    /// per turn, and returns the first id seen by both sides. Multiple valid
    /// lowest common ancestors may exist; the tie-break is deterministic:
    /// discovery order of the alternating walk, with parents expanded in
    /// index order. Returns `None` for disjoint histories.
    pub fn merge_base(
        &self,
        left: &ObjectId,
        right: &ObjectId,
    ) -> GraphResult<Option<ObjectId>> {
        let mut seen_left: HashSet<ObjectId> = HashSet::from([*left]);
        let mut seen_right: HashSet<ObjectId> = HashSet::from([*right]);
        let mut queue_left: VecDeque<ObjectId> = VecDeque::from([*left]);
        let mut queue_right: VecDeque<ObjectId> = VecDeque::from([*right]);

        while !queue_left.is_empty() || !queue_right.is_empty() {
            if let Some(found) =
                self.advance(&mut queue_left, &mut seen_left, &seen_right)?
            {
                debug!(base = %found.short_hex(), "merge base found");
                return Ok(Some(found));
            }
            if let Some(found) =
                self.advance(&mut queue_right, &mut seen_right, &seen_left)?
            {
                debug!(base = %found.short_hex(), "merge base found");
                return Ok(Some(found));
            }
        }
        Ok(None)
    }

    /// Pop one commit from a frontier; report it if the other side has seen
    /// it, otherwise expand its parents.
    fn advance(
        &self,
        queue: &mut VecDeque<ObjectId>,
        seen: &mut HashSet<ObjectId>,
        other_seen: &HashSet<ObjectId>,
    ) -> GraphResult<Option<ObjectId>> {
        let Some(id) = queue.pop_front() else {
            return Ok(None);
        };
        if other_seen.contains(&id) {
            return Ok(Some(id));
        }
        let commit = self.store.get_commit(&id)?;
        for parent in &commit.parents {
            if seen.insert(*parent) {
                queue.push_back(*parent);
            }
        }
        Ok(None)
    }

    /// Iterate the history reachable from `tip` in the given order.
    pub fn history(&self, tip: ObjectId, order: HistoryOrder) -> HistoryIter<'a> {
        HistoryIter::new(self.store, tip, order)
    }
}

/// Ordering of a history walk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HistoryOrder {
    /// Follow only the first parent of each commit: the linear history of
    /// one branch, skipping merged-in side branches.
    FirstParent,
    /// Reverse topological order over the full graph: a commit is emitted
    /// only after every one of its children in the walk has been emitted.
    Topological,
}

enum State {
    FirstParent {
        next: Option<ObjectId>,
    },
    Topological {
        initialized: bool,
        commits: HashMap<ObjectId, Commit>,
        pending_children: HashMap<ObjectId, usize>,
        ready: VecDeque<ObjectId>,
    },
}

/// Lazy iterator over commits, tips first.
///
/// Restartable from scratch only; each construction re-walks from the tip.
pub struct HistoryIter<'a> {
    store: &'a dyn ObjectStore,
    tip: ObjectId,
    state: State,
}

impl<'a> HistoryIter<'a> {
    fn new(store: &'a dyn ObjectStore, tip: ObjectId, order: HistoryOrder) -> Self {
        let state = match order {
            HistoryOrder::FirstParent => State::FirstParent { next: Some(tip) },
            HistoryOrder::Topological => State::Topological {
                initialized: false,
                commits: HashMap::new(),
                pending_children: HashMap::new(),
                ready: VecDeque::new(),
            },
        };
        Self { store, tip, state }
    }

    /// Scan the reachable graph once, recording each commit and how many
    /// in-walk children reference it.
    fn initialize_topological(&mut self) -> GraphResult<()> {
        let State::Topological {
            initialized,
            commits,
            pending_children,
            ready,
        } = &mut self.state
        else {
            return Ok(());
        };

        let mut queue = VecDeque::from([self.tip]);
        while let Some(id) = queue.pop_front() {
            if commits.contains_key(&id) {
                continue;
            }
            let commit = self.store.get_commit(&id)?;
            for parent in &commit.parents {
                *pending_children.entry(*parent).or_insert(0) += 1;
                queue.push_back(*parent);
            }
            commits.insert(id, commit);
        }

        ready.push_back(self.tip);
        *initialized = true;
        Ok(())
    }
}

impl Iterator for HistoryIter<'_> {
    type Item = GraphResult<(ObjectId, Commit)>;

    fn next(&mut self) -> Option<Self::Item> {
        if let State::Topological {
            initialized: false, ..
        } = self.state
        {
            if let Err(e) = self.initialize_topological() {
                return Some(Err(e));
            }
        }

        match &mut self.state {
            State::FirstParent { next } => {
                let id = (*next)?;
                match self.store.get_commit(&id) {
                    Err(e) => {
                        *next = None;
                        Some(Err(e.into()))
                    }
                    Ok(commit) => {
                        *next = commit.first_parent();
                        Some(Ok((id, commit)))
                    }
                }
            }
            State::Topological {
                commits,
                pending_children,
                ready,
                ..
            } => {
                let id = ready.pop_front()?;
                let commit = commits.get(&id)?.clone();
                for parent in &commit.parents {
                    let count = pending_children
                        .get_mut(parent)
                        .expect("parent counted during scan");
                    *count -= 1;
                    if *count == 0 {
                        ready.push_back(*parent);
                    }
                }
                Some(Ok((id, commit)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_store::{InMemoryObjectStore, RevObject, Signature};

    fn sig() -> Signature {
        Signature::new("alice", "alice@example.com", 0, 0)
    }

    fn commit(store: &InMemoryObjectStore, msg: &str, parents: Vec<ObjectId>) -> ObjectId {
        let c = Commit {
            tree: ObjectId::from_bytes(msg.as_bytes()),
            parents,
            author: sig(),
            committer: sig(),
            message: msg.to_string(),
        };
        store.put(&RevObject::Commit(c)).unwrap()
    }

    /// root -- a -- b -- merge(tip)
    ///          \-- c --/
    fn diamond(store: &InMemoryObjectStore) -> (ObjectId, ObjectId, ObjectId, ObjectId, ObjectId) {
        let root = commit(store, "root", vec![]);
        let a = commit(store, "a", vec![root]);
        let b = commit(store, "b", vec![a]);
        let c = commit(store, "c", vec![a]);
        let tip = commit(store, "merge", vec![b, c]);
        (root, a, b, c, tip)
    }

    #[test]
    fn ancestry_on_a_linear_chain() {
        let store = InMemoryObjectStore::new();
        let root = commit(&store, "root", vec![]);
        let mid = commit(&store, "mid", vec![root]);
        let tip = commit(&store, "tip", vec![mid]);

        let graph = CommitGraph::new(&store);
        assert!(graph.is_ancestor(&root, &tip).unwrap());
        assert!(graph.is_ancestor(&mid, &tip).unwrap());
        assert!(graph.is_ancestor(&tip, &tip).unwrap());
        assert!(!graph.is_ancestor(&tip, &root).unwrap());
    }

    #[test]
    fn ancestry_crosses_merge_commits() {
        let store = InMemoryObjectStore::new();
        let (root, _a, b, c, tip) = diamond(&store);

        let graph = CommitGraph::new(&store);
        assert!(graph.is_ancestor(&root, &tip).unwrap());
        assert!(graph.is_ancestor(&c, &tip).unwrap());
        assert!(!graph.is_ancestor(&b, &c).unwrap());
    }

    #[test]
    fn merge_base_of_a_fork_is_the_fork_point() {
        let store = InMemoryObjectStore::new();
        let (_root, a, b, c, _tip) = diamond(&store);

        let graph = CommitGraph::new(&store);
        assert_eq!(graph.merge_base(&b, &c).unwrap(), Some(a));
        assert_eq!(graph.merge_base(&c, &b).unwrap(), Some(a));
    }

    #[test]
    fn merge_base_of_an_ancestor_pair_is_the_ancestor() {
        let store = InMemoryObjectStore::new();
        let root = commit(&store, "root", vec![]);
        let tip = commit(&store, "tip", vec![root]);

        let graph = CommitGraph::new(&store);
        assert_eq!(graph.merge_base(&root, &tip).unwrap(), Some(root));
        assert_eq!(graph.merge_base(&tip, &tip).unwrap(), Some(tip));
    }

    #[test]
    fn merge_base_of_disjoint_histories_is_none() {
        let store = InMemoryObjectStore::new();
        let a = commit(&store, "a", vec![]);
        let b = commit(&store, "b", vec![]);

        let graph = CommitGraph::new(&store);
        assert_eq!(graph.merge_base(&a, &b).unwrap(), None);
    }

    #[test]
    fn first_parent_log_skips_merged_branches() {
        let store = InMemoryObjectStore::new();
        let (root, a, b, _c, tip) = diamond(&store);

        let graph = CommitGraph::new(&store);
        let ids: Vec<ObjectId> = graph
            .history(tip, HistoryOrder::FirstParent)
            .map(|r| r.unwrap().0)
            .collect();
        assert_eq!(ids, vec![tip, b, a, root]);
    }

    #[test]
    fn topological_log_emits_children_before_parents() {
        let store = InMemoryObjectStore::new();
        let (root, a, b, c, tip) = diamond(&store);

        let graph = CommitGraph::new(&store);
        let ids: Vec<ObjectId> = graph
            .history(tip, HistoryOrder::Topological)
            .map(|r| r.unwrap().0)
            .collect();

        assert_eq!(ids.len(), 5);
        assert_eq!(ids[0], tip);
        assert_eq!(*ids.last().unwrap(), root);
        let pos = |id: &ObjectId| ids.iter().position(|x| x == id).unwrap();
        assert!(pos(&tip) < pos(&b));
        assert!(pos(&tip) < pos(&c));
        assert!(pos(&b) < pos(&a));
        assert!(pos(&c) < pos(&a));
        assert!(pos(&a) < pos(&root));
    }
}
