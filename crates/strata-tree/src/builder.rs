//! Copy-on-write tree construction.
//!
//! [`TreeBuilder`] collects edits against a base tree and produces a new,
//! persisted tree. Builds are processed through an explicit work queue of
//! pending subtree tasks rather than recursion: a task either finishes as a
//! leaf or expands into one task per touched bucket, and a parent is
//! finalized once all of its children have reported back. Untouched buckets
//! are reused by reference, so an edit rewrites only the path from the root
//! to the changed leaves.
//!
//! Normalization is deterministic: a trie whose entry count drops to the
//! leaf threshold collapses back into a single leaf, so the same logical
//! content always hashes to the same root id no matter how it was built.

use std::collections::{BTreeMap, BTreeSet};

use strata_store::{Node, NodeKind, ObjectStore, RevObject, RevTree};
use strata_types::ObjectId;
use tracing::{debug, trace};

use crate::bucket::{bucket_index, DEFAULT_LEAF_THRESHOLD, MAX_BUCKET_DEPTH};
use crate::error::{TreeError, TreeResult};
use crate::walk::{find_child, trie_children};

/// One edit against a tree: insert/replace a node at a path, or remove the
/// entry at a path.
#[derive(Clone, Debug)]
pub struct PathEdit {
    /// Slash-separated path of the entry.
    pub path: String,
    /// The new node, or `None` to remove.
    pub node: Option<Node>,
}

impl PathEdit {
    pub fn put(path: impl Into<String>, node: Node) -> Self {
        Self {
            path: path.into(),
            node: Some(node),
        }
    }

    pub fn remove(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            node: None,
        }
    }
}

/// Builds a new tree from a base tree plus a set of direct-child edits.
///
/// Operates on one level of the path hierarchy; slash-separated paths are
/// handled by [`apply_edits`], which drives one builder per touched subtree.
pub struct TreeBuilder<'a> {
    store: &'a dyn ObjectStore,
    threshold: usize,
    base: RevTree,
    inserts: BTreeMap<String, Node>,
    removals: BTreeSet<String>,
}

/// Where a finished subtree reports its result.
#[derive(Clone, Copy)]
enum Slot {
    Root,
    Bucket { pending: usize, bucket: u32 },
}

/// Aggregates of a finished subtree. `id` is `None` for an empty subtree,
/// which the parent drops from its bucket index.
#[derive(Clone, Copy)]
struct Outcome {
    id: Option<ObjectId>,
    size: u64,
    num_trees: u32,
}

enum Task {
    /// All entries known in memory; may still need splitting.
    Fresh {
        slot: Slot,
        depth: usize,
        entries: BTreeMap<String, Node>,
    },
    /// An existing tree with edits to apply at this depth.
    Edit {
        slot: Slot,
        depth: usize,
        base: RevTree,
        inserts: BTreeMap<String, Node>,
        removals: BTreeSet<String>,
    },
}

/// A bucketed node waiting for its touched children to finish.
struct Pending {
    slot: Slot,
    size: u64,
    num_trees: u32,
    buckets: BTreeMap<u32, ObjectId>,
    remaining: usize,
}

impl<'a> TreeBuilder<'a> {
    /// Start from an existing base tree.
    pub fn new(store: &'a dyn ObjectStore, base: RevTree) -> Self {
        Self {
            store,
            threshold: DEFAULT_LEAF_THRESHOLD,
            base,
            inserts: BTreeMap::new(),
            removals: BTreeSet::new(),
        }
    }

    /// Start from the empty tree.
    pub fn empty(store: &'a dyn ObjectStore) -> Self {
        Self::new(store, RevTree::empty())
    }

    /// Override the leaf split threshold. Tests use small thresholds to
    /// exercise bucketed shapes cheaply.
    pub fn with_threshold(mut self, threshold: usize) -> Self {
        self.threshold = threshold.max(1);
        self
    }

    /// Insert or replace a direct child entry.
    pub fn put(&mut self, node: Node) {
        self.removals.remove(&node.name);
        self.inserts.insert(node.name.clone(), node);
    }

    /// Remove the direct child entry with the given name.
    pub fn remove(&mut self, name: &str) {
        self.inserts.remove(name);
        self.removals.insert(name.to_string());
    }

    /// Apply the collected edits, persist every new subtree, and return the
    /// resulting tree.
    pub fn build(self) -> TreeResult<RevTree> {
        let root = Task::Edit {
            slot: Slot::Root,
            depth: 0,
            base: self.base.clone(),
            inserts: self.inserts.clone(),
            removals: self.removals.clone(),
        };

        let mut tasks: Vec<Task> = vec![root];
        let mut pendings: Vec<Pending> = Vec::new();
        let mut result: Option<RevTree> = None;

        while let Some(task) = tasks.pop() {
            match task {
                Task::Fresh {
                    slot,
                    depth,
                    entries,
                } => {
                    if entries.len() <= self.threshold || depth >= MAX_BUCKET_DEPTH {
                        let (tree, outcome) = self.make_leaf(entries)?;
                        self.complete(slot, outcome, tree, &mut pendings, &mut result)?;
                    } else {
                        self.split(slot, depth, entries, &mut tasks, &mut pendings);
                    }
                }
                Task::Edit {
                    slot,
                    depth,
                    base,
                    inserts,
                    removals,
                } => {
                    if base.is_leaf() {
                        // Merge the edits into the entry list and let the
                        // fresh path decide whether to split.
                        let mut merged: BTreeMap<String, Node> = base
                            .entries
                            .into_iter()
                            .map(|n| (n.name.clone(), n))
                            .collect();
                        for name in &removals {
                            merged.remove(name);
                        }
                        merged.extend(inserts);
                        tasks.push(Task::Fresh {
                            slot,
                            depth,
                            entries: merged,
                        });
                    } else {
                        self.edit_bucketed(
                            slot,
                            depth,
                            base,
                            inserts,
                            removals,
                            &mut tasks,
                            &mut pendings,
                            &mut result,
                        )?;
                    }
                }
            }
        }

        let tree = result.unwrap_or_else(RevTree::empty);
        debug!(
            id = %tree.id().short_hex(),
            size = tree.size,
            num_trees = tree.num_trees,
            bucketed = tree.is_bucketed(),
            "tree built"
        );
        Ok(tree)
    }

    fn split(
        &self,
        slot: Slot,
        depth: usize,
        entries: BTreeMap<String, Node>,
        tasks: &mut Vec<Task>,
        pendings: &mut Vec<Pending>,
    ) {
        let mut parts: BTreeMap<u32, BTreeMap<String, Node>> = BTreeMap::new();
        for (name, node) in entries {
            let bucket = bucket_index(&name, depth);
            parts.entry(bucket).or_default().insert(name, node);
        }
        trace!(depth, buckets = parts.len(), "splitting leaf into buckets");

        let pending = pendings.len();
        pendings.push(Pending {
            slot,
            size: 0,
            num_trees: 0,
            buckets: BTreeMap::new(),
            remaining: parts.len(),
        });
        for (bucket, part) in parts {
            tasks.push(Task::Fresh {
                slot: Slot::Bucket { pending, bucket },
                depth: depth + 1,
                entries: part,
            });
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn edit_bucketed(
        &self,
        slot: Slot,
        depth: usize,
        base: RevTree,
        inserts: BTreeMap<String, Node>,
        removals: BTreeSet<String>,
        tasks: &mut Vec<Task>,
        pendings: &mut Vec<Pending>,
        result: &mut Option<RevTree>,
    ) -> TreeResult<()> {
        // Route the edits to their buckets at this depth.
        let mut ins: BTreeMap<u32, BTreeMap<String, Node>> = BTreeMap::new();
        let mut rem: BTreeMap<u32, BTreeSet<String>> = BTreeMap::new();
        for (name, node) in inserts {
            ins.entry(bucket_index(&name, depth)).or_default().insert(name, node);
        }
        for name in removals {
            rem.entry(bucket_index(&name, depth)).or_default().insert(name);
        }

        let mut touched: BTreeSet<u32> = ins.keys().copied().collect();
        touched.extend(rem.keys().copied());
        // A removal routed to an absent bucket is a no-op.
        touched.retain(|b| ins.contains_key(b) && !ins[b].is_empty() || base.buckets.contains_key(b));

        if touched.is_empty() {
            let outcome = Outcome {
                id: Some(base.id()),
                size: base.size,
                num_trees: base.num_trees,
            };
            self.complete(slot, outcome, base, pendings, result)?;
            return Ok(());
        }

        // Untouched buckets are reused by reference; the running totals
        // start from the base minus the touched buckets' old aggregates.
        let mut size = base.size;
        let mut num_trees = base.num_trees;
        let mut reused = base.buckets.clone();
        let mut children: Vec<Task> = Vec::new();

        let pending = pendings.len();
        for bucket in &touched {
            let child_slot = Slot::Bucket {
                pending,
                bucket: *bucket,
            };
            let child_ins = ins.remove(bucket).unwrap_or_default();
            let child_rem = rem.remove(bucket).unwrap_or_default();
            match reused.remove(bucket) {
                Some(id) => {
                    let old = self.store.get_tree(&id)?;
                    size -= old.size;
                    num_trees -= old.num_trees;
                    children.push(Task::Edit {
                        slot: child_slot,
                        depth: depth + 1,
                        base: old,
                        inserts: child_ins,
                        removals: child_rem,
                    });
                }
                None => {
                    children.push(Task::Fresh {
                        slot: child_slot,
                        depth: depth + 1,
                        entries: child_ins,
                    });
                }
            }
        }

        pendings.push(Pending {
            slot,
            size,
            num_trees,
            buckets: reused,
            remaining: children.len(),
        });
        tasks.extend(children);
        Ok(())
    }

    /// Build, persist and summarize a leaf tree from a sorted entry map.
    fn make_leaf(&self, entries: BTreeMap<String, Node>) -> TreeResult<(RevTree, Outcome)> {
        let size = entries.values().filter(|n| n.kind == NodeKind::Feature).count() as u64;
        let num_trees = entries.values().filter(|n| n.kind == NodeKind::Tree).count() as u32;
        let tree = RevTree::leaf(entries.into_values().collect(), size, num_trees);
        let id = self.store.put(&RevObject::Tree(tree.clone()))?;
        let outcome = Outcome {
            id: if tree.is_empty() { None } else { Some(id) },
            size,
            num_trees,
        };
        Ok((tree, outcome))
    }

    /// Report a finished subtree to its parent, cascading as parents
    /// themselves finish.
    fn complete(
        &self,
        slot: Slot,
        outcome: Outcome,
        tree: RevTree,
        pendings: &mut Vec<Pending>,
        result: &mut Option<RevTree>,
    ) -> TreeResult<()> {
        let mut current = (slot, outcome, tree);
        loop {
            let (slot, outcome, tree) = current;
            match slot {
                Slot::Root => {
                    *result = Some(tree);
                    return Ok(());
                }
                Slot::Bucket { pending, bucket } => {
                    let p = &mut pendings[pending];
                    if let Some(id) = outcome.id {
                        p.buckets.insert(bucket, id);
                    }
                    p.size += outcome.size;
                    p.num_trees += outcome.num_trees;
                    p.remaining -= 1;
                    if p.remaining > 0 {
                        return Ok(());
                    }
                    current = self.finalize_pending(pending, pendings)?;
                }
            }
        }
    }

    /// All children of a pending bucketed node have reported; emit either a
    /// bucketed tree or, if the trie shrank to the threshold, a collapsed
    /// leaf.
    fn finalize_pending(
        &self,
        pending: usize,
        pendings: &mut Vec<Pending>,
    ) -> TreeResult<(Slot, Outcome, RevTree)> {
        let p = &pendings[pending];
        let slot = p.slot;
        let entry_count = p.size + u64::from(p.num_trees);

        if entry_count <= self.threshold as u64 {
            trace!(entries = entry_count, "collapsing bucketed tree into leaf");
            let mut gathered: BTreeMap<String, Node> = BTreeMap::new();
            for id in p.buckets.values() {
                let child = self.store.get_tree(id)?;
                for node in trie_children(self.store, &child)? {
                    gathered.insert(node.name.clone(), node);
                }
            }
            let (tree, outcome) = self.make_leaf(gathered)?;
            return Ok((slot, outcome, tree));
        }

        let tree = RevTree::bucketed(p.buckets.clone(), p.size, p.num_trees);
        let id = self.store.put(&RevObject::Tree(tree.clone()))?;
        let outcome = Outcome {
            id: Some(id),
            size: p.size,
            num_trees: p.num_trees,
        };
        Ok((slot, outcome, tree))
    }
}

/// Apply a batch of path edits to `root` and return the new, persisted root.
///
/// Edits are grouped by their leading path segment: direct children are
/// edited in place, deeper paths recurse into (or create) the named subtree
/// and re-link its new id, copy-on-write. A subtree that becomes empty is
/// unlinked from its parent.
pub fn apply_edits(
    store: &dyn ObjectStore,
    root: &RevTree,
    edits: Vec<PathEdit>,
) -> TreeResult<RevTree> {
    apply_edits_with_threshold(store, root, edits, DEFAULT_LEAF_THRESHOLD)
}

/// [`apply_edits`] with an explicit leaf split threshold.
pub fn apply_edits_with_threshold(
    store: &dyn ObjectStore,
    root: &RevTree,
    edits: Vec<PathEdit>,
    threshold: usize,
) -> TreeResult<RevTree> {
    let mut builder = TreeBuilder::new(store, root.clone()).with_threshold(threshold);
    let mut nested: BTreeMap<String, Vec<PathEdit>> = BTreeMap::new();

    for edit in edits {
        if edit.path.is_empty() || edit.path.split('/').any(str::is_empty) {
            return Err(TreeError::InvalidPath(edit.path));
        }
        match edit.path.split_once('/') {
            None => match edit.node {
                Some(mut node) => {
                    node.name = edit.path;
                    builder.put(node);
                }
                None => builder.remove(&edit.path),
            },
            Some((head, rest)) => {
                nested.entry(head.to_string()).or_default().push(PathEdit {
                    path: rest.to_string(),
                    node: edit.node,
                });
            }
        }
    }

    for (name, sub_edits) in nested {
        let existing = find_child(store, root, &name)?;
        let (child_base, metadata_id) = match &existing {
            Some(node) if node.kind == NodeKind::Tree => {
                (store.get_tree(&node.id)?, node.metadata_id)
            }
            Some(node) => return Err(TreeError::NotATree(node.name.clone())),
            None => (RevTree::empty(), ObjectId::NULL),
        };

        let new_child = apply_edits_with_threshold(store, &child_base, sub_edits, threshold)?;
        if new_child.is_empty() {
            if existing.is_some() {
                builder.remove(&name);
            }
        } else {
            builder.put(Node::tree(name, new_child.id(), metadata_id));
        }
    }

    builder.build()
}
