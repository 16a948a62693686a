//! Lockstep tree comparison.
//!
//! The walk is expressed as an explicit stack of suspended frames, so the
//! iterator can hand out one change record at a time. Every level is
//! merge-joined by entry name: bucketed levels are first flattened back to
//! their logical entries, skipping any bucket subtree both sides share, so
//! change records always come out in ascending path order.

use std::collections::{BTreeMap, BTreeSet};
use std::iter::Peekable;
use std::vec::IntoIter;

use strata_store::{Node, NodeKind, ObjectStore, RevTree};
use strata_types::ObjectId;
use tracing::trace;

use crate::error::DiffResult;

/// Classification of a change record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Removed,
    Modified,
}

/// One per-path change record.
///
/// `old`/`new` absent means the entry did not exist on that side.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiffEntry {
    /// Full slash-separated path of the changed feature.
    pub path: String,
    /// The entry on the old side, if it existed.
    pub old: Option<Node>,
    /// The entry on the new side, if it exists.
    pub new: Option<Node>,
}

impl DiffEntry {
    /// What kind of change this record describes.
    pub fn kind(&self) -> ChangeKind {
        match (&self.old, &self.new) {
            (None, Some(_)) => ChangeKind::Added,
            (Some(_), None) => ChangeKind::Removed,
            _ => ChangeKind::Modified,
        }
    }

    /// Object id on the old side, or [`ObjectId::NULL`] if absent.
    pub fn old_id(&self) -> ObjectId {
        self.old.as_ref().map(|n| n.id).unwrap_or(ObjectId::NULL)
    }

    /// Object id on the new side, or [`ObjectId::NULL`] if absent.
    pub fn new_id(&self) -> ObjectId {
        self.new.as_ref().map(|n| n.id).unwrap_or(ObjectId::NULL)
    }
}

/// One side of a pending comparison: a tree reference (loaded lazily, so
/// equal ids never touch the store) or a list of virtual entries.
enum Source {
    Tree(ObjectId),
    Entries(Vec<Node>),
}

impl Source {
    fn empty() -> Self {
        Source::Entries(Vec::new())
    }
}

enum Shape {
    Leaf(Vec<Node>),
    Bucketed(BTreeMap<u32, ObjectId>),
}

enum Frame {
    /// The root comparison, not yet classified.
    Start(Option<(ObjectId, ObjectId)>),
    /// Merge-join of two name-sorted entry lists.
    Join {
        prefix: String,
        left: Peekable<IntoIter<Node>>,
        right: Peekable<IntoIter<Node>>,
    },
}

enum Step {
    Pop,
    Nothing,
    Emit(DiffEntry),
    Descend(String, Source, Source),
    EmitThenDescend(DiffEntry, String, Source, Source),
}

/// Lazy iterator over the changes between two trees.
///
/// Finite, and restartable only from scratch: each call to [`diff_trees`]
/// re-walks from the two given roots. Emission order is deterministic:
/// depth-first, paths ascending by name at every level.
pub struct TreeDiffIter<'a> {
    store: &'a dyn ObjectStore,
    stack: Vec<Frame>,
}

/// Compare two trees by root id and lazily produce their change records.
///
/// [`ObjectId::NULL`] on either side stands for the empty tree.
pub fn diff_trees<'a>(
    store: &'a dyn ObjectStore,
    old: &ObjectId,
    new: &ObjectId,
) -> TreeDiffIter<'a> {
    TreeDiffIter {
        store,
        stack: vec![Frame::Start(Some((*old, *new)))],
    }
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}/{name}")
    }
}

fn removal(path: String, node: Node) -> Step {
    match node.kind {
        NodeKind::Feature => Step::Emit(DiffEntry {
            path,
            old: Some(node),
            new: None,
        }),
        NodeKind::Tree => Step::Descend(path, Source::Tree(node.id), Source::empty()),
    }
}

fn addition(path: String, node: Node) -> Step {
    match node.kind {
        NodeKind::Feature => Step::Emit(DiffEntry {
            path,
            old: None,
            new: Some(node),
        }),
        NodeKind::Tree => Step::Descend(path, Source::empty(), Source::Tree(node.id)),
    }
}

fn step_join(
    prefix: &str,
    left: &mut Peekable<IntoIter<Node>>,
    right: &mut Peekable<IntoIter<Node>>,
) -> Step {
    use std::cmp::Ordering;

    match (left.peek(), right.peek()) {
        (None, None) => Step::Pop,
        (Some(_), None) => {
            let node = left.next().expect("peeked");
            removal(join(prefix, &node.name), node)
        }
        (None, Some(_)) => {
            let node = right.next().expect("peeked");
            addition(join(prefix, &node.name), node)
        }
        (Some(l), Some(r)) => match l.name.cmp(&r.name) {
            Ordering::Less => {
                let node = left.next().expect("peeked");
                removal(join(prefix, &node.name), node)
            }
            Ordering::Greater => {
                let node = right.next().expect("peeked");
                addition(join(prefix, &node.name), node)
            }
            Ordering::Equal => {
                let l = left.next().expect("peeked");
                let r = right.next().expect("peeked");
                let path = join(prefix, &l.name);
                if l.id == r.id && l.metadata_id == r.metadata_id && l.kind == r.kind {
                    return Step::Nothing;
                }
                match (l.kind, r.kind) {
                    (NodeKind::Feature, NodeKind::Feature) => Step::Emit(DiffEntry {
                        path,
                        old: Some(l),
                        new: Some(r),
                    }),
                    (NodeKind::Tree, NodeKind::Tree) => {
                        Step::Descend(path, Source::Tree(l.id), Source::Tree(r.id))
                    }
                    (NodeKind::Feature, NodeKind::Tree) => Step::EmitThenDescend(
                        DiffEntry {
                            path: path.clone(),
                            old: Some(l),
                            new: None,
                        },
                        path,
                        Source::empty(),
                        Source::Tree(r.id),
                    ),
                    (NodeKind::Tree, NodeKind::Feature) => Step::EmitThenDescend(
                        DiffEntry {
                            path: path.clone(),
                            old: None,
                            new: Some(r),
                        },
                        path,
                        Source::Tree(l.id),
                        Source::empty(),
                    ),
                }
            }
        },
    }
}

impl TreeDiffIter<'_> {
    fn shape(&self, source: Source) -> DiffResult<Shape> {
        match source {
            Source::Entries(entries) => Ok(Shape::Leaf(entries)),
            Source::Tree(id) if id.is_null() => Ok(Shape::Leaf(Vec::new())),
            Source::Tree(id) => {
                let tree: RevTree = self.store.get_tree(&id)?;
                if tree.is_bucketed() {
                    Ok(Shape::Bucketed(tree.buckets))
                } else {
                    Ok(Shape::Leaf(tree.entries))
                }
            }
        }
    }

    /// Decide how to compare two sources. Returns `None` when the subtrees
    /// are identical and nothing needs walking.
    fn classify(&self, prefix: String, left: Source, right: Source) -> DiffResult<Option<Frame>> {
        if let (Source::Tree(a), Source::Tree(b)) = (&left, &right) {
            if a == b {
                trace!(id = %a.short_hex(), "identical subtree skipped");
                return Ok(None);
            }
        }

        let left = self.shape(left)?;
        let right = self.shape(right)?;
        let (l, r) = match (left, right) {
            (Shape::Leaf(l), Shape::Leaf(r)) => (l, r),
            (left, right) => {
                let mut l = Vec::new();
                let mut r = Vec::new();
                self.gather_changed(left, right, &mut l, &mut r)?;
                l.sort();
                r.sort();
                (l, r)
            }
        };
        Ok(Some(Frame::Join {
            prefix,
            left: l.into_iter().peekable(),
            right: r.into_iter().peekable(),
        }))
    }

    /// Flatten a bucketed comparison back to per-side entry lists, skipping
    /// any bucket subtree both sides share.
    fn gather_changed(
        &self,
        left: Shape,
        right: Shape,
        out_left: &mut Vec<Node>,
        out_right: &mut Vec<Node>,
    ) -> DiffResult<()> {
        match (left, right) {
            (Shape::Leaf(l), Shape::Leaf(r)) => {
                out_left.extend(l);
                out_right.extend(r);
            }
            (Shape::Leaf(l), Shape::Bucketed(r)) => {
                out_left.extend(l);
                self.gather_all(r, out_right)?;
            }
            (Shape::Bucketed(l), Shape::Leaf(r)) => {
                self.gather_all(l, out_left)?;
                out_right.extend(r);
            }
            (Shape::Bucketed(l), Shape::Bucketed(r)) => {
                let indices: BTreeSet<u32> = l.keys().chain(r.keys()).copied().collect();
                for i in indices {
                    if let (Some(a), Some(b)) = (l.get(&i), r.get(&i)) {
                        if a == b {
                            trace!(id = %a.short_hex(), "identical bucket pair skipped");
                            continue;
                        }
                    }
                    let ls = self.bucket_shape(l.get(&i))?;
                    let rs = self.bucket_shape(r.get(&i))?;
                    self.gather_changed(ls, rs, out_left, out_right)?;
                }
            }
        }
        Ok(())
    }

    fn bucket_shape(&self, id: Option<&ObjectId>) -> DiffResult<Shape> {
        self.shape(id.map_or_else(Source::empty, |id| Source::Tree(*id)))
    }

    /// Flatten an entire bucket trie into its logical entries.
    fn gather_all(&self, buckets: BTreeMap<u32, ObjectId>, out: &mut Vec<Node>) -> DiffResult<()> {
        let mut pending: Vec<ObjectId> = buckets.into_values().collect();
        while let Some(id) = pending.pop() {
            let tree: RevTree = self.store.get_tree(&id)?;
            if tree.is_bucketed() {
                pending.extend(tree.buckets.into_values());
            } else {
                out.extend(tree.entries);
            }
        }
        Ok(())
    }
}

impl Iterator for TreeDiffIter<'_> {
    type Item = DiffResult<DiffEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let step = {
                let frame = self.stack.last_mut()?;
                match frame {
                    Frame::Start(pair) => match pair.take() {
                        None => Step::Pop,
                        Some((old, new)) => Step::Descend(
                            String::new(),
                            Source::Tree(old),
                            Source::Tree(new),
                        ),
                    },
                    Frame::Join {
                        prefix,
                        left,
                        right,
                    } => step_join(prefix, left, right),
                }
            };

            match step {
                Step::Pop => {
                    self.stack.pop();
                }
                Step::Nothing => {}
                Step::Emit(entry) => return Some(Ok(entry)),
                Step::Descend(prefix, l, r) => match self.classify(prefix, l, r) {
                    Ok(Some(frame)) => self.stack.push(frame),
                    Ok(None) => {}
                    Err(e) => return Some(Err(e)),
                },
                Step::EmitThenDescend(entry, prefix, l, r) => {
                    match self.classify(prefix, l, r) {
                        Ok(Some(frame)) => self.stack.push(frame),
                        Ok(None) => {}
                        Err(e) => return Some(Err(e)),
                    }
                    return Some(Ok(entry));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_store::{Feature, InMemoryObjectStore, Value};
    use strata_tree::{apply_edits_with_threshold, PathEdit, TreeBuilder};

    const T: usize = 8;

    fn node(name: &str, version: u32) -> Node {
        let feature = Feature::new(
            ObjectId::from_bytes(b"type"),
            vec![Value::Text(name.to_string()), Value::Int(i64::from(version))],
        );
        Node::feature(name, feature.id(), ObjectId::from_bytes(b"type"))
    }

    fn build(store: &InMemoryObjectStore, nodes: Vec<Node>) -> RevTree {
        let mut b = TreeBuilder::empty(store).with_threshold(T);
        for n in nodes {
            b.put(n);
        }
        b.build().unwrap()
    }

    fn collect(store: &InMemoryObjectStore, old: &RevTree, new: &RevTree) -> Vec<DiffEntry> {
        diff_trees(store, &old.id(), &new.id())
            .map(|r| r.unwrap())
            .collect()
    }

    #[test]
    fn identical_roots_produce_no_changes_and_no_reads() {
        // The store does not even contain the tree: equal ids must
        // short-circuit before any load is attempted.
        let store = InMemoryObjectStore::new();
        let id = ObjectId::from_bytes(b"some root");
        let changes: Vec<_> = diff_trees(&store, &id, &id).collect();
        assert!(changes.is_empty());
    }

    #[test]
    fn flat_add_remove_modify() {
        let store = InMemoryObjectStore::new();
        let old = build(&store, vec![node("a", 1), node("b", 1), node("c", 1)]);
        let new = build(&store, vec![node("b", 2), node("c", 1), node("d", 1)]);

        let changes = collect(&store, &old, &new);
        let kinds: Vec<(String, ChangeKind)> = changes
            .iter()
            .map(|c| (c.path.clone(), c.kind()))
            .collect();
        assert_eq!(
            kinds,
            vec![
                ("a".to_string(), ChangeKind::Removed),
                ("b".to_string(), ChangeKind::Modified),
                ("d".to_string(), ChangeKind::Added),
            ]
        );
    }

    #[test]
    fn null_id_stands_for_the_empty_tree() {
        let store = InMemoryObjectStore::new();
        let tree = build(&store, vec![node("a", 1), node("b", 1)]);

        let added = diff_trees(&store, &ObjectId::NULL, &tree.id()).count();
        assert_eq!(added, 2);
        let removed: Vec<_> = diff_trees(&store, &tree.id(), &ObjectId::NULL)
            .map(|r| r.unwrap())
            .collect();
        assert!(removed.iter().all(|c| c.kind() == ChangeKind::Removed));
    }

    #[test]
    fn nested_changes_carry_full_paths() {
        let store = InMemoryObjectStore::new();
        let old = apply_edits_with_threshold(
            &store,
            &strata_store::RevTree::empty(),
            vec![
                PathEdit::put("roads/r.1", node("r.1", 1)),
                PathEdit::put("roads/r.2", node("r.2", 1)),
            ],
            T,
        )
        .unwrap();
        let new = apply_edits_with_threshold(
            &store,
            &old,
            vec![PathEdit::put("roads/r.2", node("r.2", 2))],
            T,
        )
        .unwrap();

        let changes = collect(&store, &old, &new);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].path, "roads/r.2");
        assert_eq!(changes[0].kind(), ChangeKind::Modified);
    }

    #[test]
    fn removed_subtree_expands_to_per_feature_removals() {
        let store = InMemoryObjectStore::new();
        let old = apply_edits_with_threshold(
            &store,
            &strata_store::RevTree::empty(),
            vec![
                PathEdit::put("roads/r.1", node("r.1", 1)),
                PathEdit::put("roads/r.2", node("r.2", 1)),
                PathEdit::put("keep", node("keep", 1)),
            ],
            T,
        )
        .unwrap();
        let new = apply_edits_with_threshold(
            &store,
            &old,
            vec![
                PathEdit::remove("roads/r.1"),
                PathEdit::remove("roads/r.2"),
            ],
            T,
        )
        .unwrap();

        let changes = collect(&store, &old, &new);
        let paths: Vec<&str> = changes.iter().map(|c| c.path.as_str()).collect();
        assert_eq!(paths, ["roads/r.1", "roads/r.2"]);
        assert!(changes.iter().all(|c| c.kind() == ChangeKind::Removed));
    }

    #[test]
    fn single_change_in_bucketed_tree() {
        let store = InMemoryObjectStore::new();
        let base: Vec<Node> = (0..100).map(|i| node(&format!("f.{i}"), 1)).collect();
        let old = build(&store, base.clone());
        assert!(old.is_bucketed());

        let mut changed = base;
        changed[42] = node("f.42", 2);
        let new = build(&store, changed);

        let changes = collect(&store, &old, &new);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].path, "f.42");
        assert_eq!(changes[0].kind(), ChangeKind::Modified);
    }

    #[test]
    fn bucketed_diff_emits_paths_in_ascending_order() {
        let store = InMemoryObjectStore::new();
        let base: Vec<Node> = (0..30).map(|i| node(&format!("f.{i:02}"), 1)).collect();
        let old = build(&store, base.clone());
        assert!(old.is_bucketed());

        let mut changed = base;
        for i in (0..30).step_by(3) {
            changed[i] = node(&format!("f.{i:02}"), 2);
        }
        let new = build(&store, changed);

        let changes = collect(&store, &old, &new);
        let paths: Vec<&str> = changes.iter().map(|c| c.path.as_str()).collect();
        let mut sorted = paths.clone();
        sorted.sort_unstable();
        assert_eq!(paths, sorted);
        assert_eq!(changes.len(), 10);

        let from_empty: Vec<String> = diff_trees(&store, &ObjectId::NULL, &old.id())
            .map(|r| r.unwrap().path)
            .collect();
        let mut expected = from_empty.clone();
        expected.sort_unstable();
        assert_eq!(from_empty, expected);
        assert_eq!(from_empty.len(), 30);
    }

    #[test]
    fn leaf_versus_bucketed_shapes_reconcile() {
        let store = InMemoryObjectStore::new();
        let small: Vec<Node> = (0..4).map(|i| node(&format!("f.{i}"), 1)).collect();
        let big: Vec<Node> = (0..40).map(|i| node(&format!("f.{i}"), 1)).collect();
        let old = build(&store, small);
        let new = build(&store, big);
        assert!(old.is_leaf());
        assert!(new.is_bucketed());

        let changes = collect(&store, &old, &new);
        assert_eq!(changes.len(), 36);
        assert!(changes.iter().all(|c| c.kind() == ChangeKind::Added));
    }

    #[test]
    fn walk_is_restartable_from_scratch() {
        let store = InMemoryObjectStore::new();
        let old = build(&store, vec![node("a", 1)]);
        let new = build(&store, vec![node("a", 2), node("b", 1)]);

        let first = collect(&store, &old, &new);
        let second = collect(&store, &old, &new);
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }
}
