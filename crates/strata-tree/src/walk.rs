//! Lazy tree traversal: path lookup and depth-first enumeration.

use strata_store::{Node, NodeKind, ObjectStore, RevTree};
use strata_types::ObjectId;

use crate::bucket::bucket_index;
use crate::error::{TreeError, TreeResult};

/// A materialized path: slash-separated segments plus the entry found there.
///
/// Not persisted — computed on demand while walking a tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeRef {
    /// Full slash-separated path of the entry.
    pub path: String,
    /// The entry at that path (carries the object ID and, for features, the
    /// governing feature type ID).
    pub node: Node,
}

impl NodeRef {
    pub fn new(path: impl Into<String>, node: Node) -> Self {
        Self {
            path: path.into(),
            node,
        }
    }
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}/{name}")
    }
}

/// Find the direct child of `tree` named `name`, descending through buckets.
///
/// Returns `Ok(None)` when no such child exists.
pub fn find_child(
    store: &dyn ObjectStore,
    tree: &RevTree,
    name: &str,
) -> TreeResult<Option<Node>> {
    let mut current = tree.clone();
    let mut depth = 0;
    loop {
        if current.is_leaf() {
            return Ok(current.entry(name).cloned());
        }
        let bucket = bucket_index(name, depth);
        match current.buckets.get(&bucket) {
            None => return Ok(None),
            Some(id) => {
                current = store.get_tree(id)?;
                depth += 1;
            }
        }
    }
}

/// Look up a single slash-separated path starting at `root`.
///
/// Walks one segment at a time; bucketed levels recompute the segment's
/// bucket at each depth, leaf levels binary-search the sorted entries.
/// Returns `Ok(None)` when the path is absent at any level.
pub fn find_path(
    store: &dyn ObjectStore,
    root: &RevTree,
    path: &str,
) -> TreeResult<Option<NodeRef>> {
    if path.is_empty() || path.split('/').any(str::is_empty) {
        return Err(TreeError::InvalidPath(path.to_string()));
    }

    let mut current = root.clone();
    let segments: Vec<&str> = path.split('/').collect();
    for (i, segment) in segments.iter().enumerate() {
        let Some(node) = find_child(store, &current, segment)? else {
            return Ok(None);
        };
        if i + 1 == segments.len() {
            return Ok(Some(NodeRef::new(path, node)));
        }
        if node.kind != NodeKind::Tree {
            // An intermediate segment resolved to a feature; the full path
            // cannot exist.
            return Ok(None);
        }
        current = store.get_tree(&node.id)?;
    }
    unreachable!("empty paths are rejected above")
}

/// What a [`TreeWalker`] emits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WalkStrategy {
    /// Only feature entries, descending through named subtrees.
    FeaturesOnly,
    /// Every entry: subtree entries are emitted before their contents.
    All,
}

struct Frame {
    prefix: String,
    entries: std::vec::IntoIter<Node>,
}

/// Lazy depth-first enumeration of a tree's entries.
///
/// Traversal order is deterministic: depth-first, names ascending at every
/// level. Bucketed collections are flattened back to their logical entries
/// before emission, so bucket structure never shows through. The walk is
/// restartable from scratch only — each construction re-walks from the given
/// root.
pub struct TreeWalker<'a> {
    store: &'a dyn ObjectStore,
    strategy: WalkStrategy,
    root: Option<RevTree>,
    stack: Vec<Frame>,
}

impl<'a> TreeWalker<'a> {
    /// Walk all features under `root`.
    pub fn new(store: &'a dyn ObjectStore, root: RevTree) -> Self {
        Self::with_strategy(store, root, WalkStrategy::FeaturesOnly)
    }

    /// Walk with an explicit emission strategy.
    pub fn with_strategy(
        store: &'a dyn ObjectStore,
        root: RevTree,
        strategy: WalkStrategy,
    ) -> Self {
        Self {
            store,
            strategy,
            root: Some(root),
            stack: Vec::new(),
        }
    }

    fn push_tree(&mut self, prefix: String, tree: RevTree) -> TreeResult<()> {
        let entries = if tree.is_bucketed() {
            trie_children(self.store, &tree)?
        } else {
            tree.entries
        };
        self.stack.push(Frame {
            prefix,
            entries: entries.into_iter(),
        });
        Ok(())
    }

    fn push_subtree(&mut self, prefix: String, id: &ObjectId) -> TreeResult<()> {
        let tree = self.store.get_tree(id)?;
        self.push_tree(prefix, tree)
    }
}

impl Iterator for TreeWalker<'_> {
    type Item = TreeResult<NodeRef>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(root) = self.root.take() {
            if let Err(e) = self.push_tree(String::new(), root) {
                return Some(Err(e));
            }
        }
        loop {
            let frame = self.stack.last_mut()?;
            let prefix = frame.prefix.clone();
            match frame.entries.next() {
                None => {
                    self.stack.pop();
                }
                Some(node) => {
                    let path = join(&prefix, &node.name);
                    match node.kind {
                        NodeKind::Feature => {
                            return Some(Ok(NodeRef::new(path, node)));
                        }
                        NodeKind::Tree => {
                            let id = node.id;
                            let emit = self.strategy == WalkStrategy::All;
                            if let Err(e) = self.push_subtree(path.clone(), &id) {
                                return Some(Err(e));
                            }
                            if emit {
                                // The subtree frame is on top of the stack,
                                // so its contents follow the entry itself.
                                return Some(Ok(NodeRef::new(path, node)));
                            }
                        }
                    }
                }
            }
        }
    }
}

/// The direct logical children of a tree, gathered from its bucket trie and
/// sorted by name.
///
/// Bounded by the tree's own entry count; named subtrees are not descended.
pub fn trie_children(store: &dyn ObjectStore, tree: &RevTree) -> TreeResult<Vec<Node>> {
    let mut children = Vec::new();
    let mut stack = vec![tree.clone()];
    while let Some(t) = stack.pop() {
        if t.is_leaf() {
            children.extend(t.entries);
        } else {
            for id in t.buckets.values() {
                stack.push(store.get_tree(id)?);
            }
        }
    }
    children.sort();
    Ok(children)
}

/// Total number of features under `tree`, descending named subtrees.
pub fn total_size(store: &dyn ObjectStore, tree: &RevTree) -> TreeResult<u64> {
    let mut total = 0;
    let mut stack = vec![tree.clone()];
    while let Some(t) = stack.pop() {
        total += t.size;
        if t.num_trees > 0 {
            for child in trie_children(store, &t)? {
                if child.kind == NodeKind::Tree {
                    stack.push(store.get_tree(&child.id)?);
                }
            }
        }
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_store::{InMemoryObjectStore, RevObject};

    fn node(name: &str) -> Node {
        Node::feature(
            name,
            ObjectId::from_bytes(name.as_bytes()),
            ObjectId::from_bytes(b"type"),
        )
    }

    fn put_leaf(store: &InMemoryObjectStore, names: &[&str]) -> RevTree {
        let entries: Vec<Node> = names.iter().map(|n| node(n)).collect();
        let size = entries.len() as u64;
        let tree = RevTree::leaf(entries, size, 0);
        store.put(&RevObject::Tree(tree.clone())).unwrap();
        tree
    }

    #[test]
    fn find_path_in_leaf() {
        let store = InMemoryObjectStore::new();
        let tree = put_leaf(&store, &["a", "b", "c"]);
        let found = find_path(&store, &tree, "b").unwrap().unwrap();
        assert_eq!(found.path, "b");
        assert_eq!(found.node.name, "b");
        assert!(find_path(&store, &tree, "zzz").unwrap().is_none());
    }

    #[test]
    fn find_path_through_named_subtree() {
        let store = InMemoryObjectStore::new();
        let child = put_leaf(&store, &["road.1", "road.2"]);
        let root = RevTree::leaf(
            vec![Node::tree("roads", child.id(), ObjectId::NULL)],
            0,
            1,
        );
        store.put(&RevObject::Tree(root.clone())).unwrap();

        let found = find_path(&store, &root, "roads/road.2").unwrap().unwrap();
        assert_eq!(found.path, "roads/road.2");
        assert_eq!(found.node.kind, NodeKind::Feature);
        assert!(find_path(&store, &root, "roads/road.9").unwrap().is_none());
        // A feature used as an intermediate segment is simply absent.
        assert!(find_path(&store, &root, "roads/road.1/x").unwrap().is_none());
    }

    #[test]
    fn find_path_rejects_malformed_paths() {
        let store = InMemoryObjectStore::new();
        let tree = put_leaf(&store, &["a"]);
        assert!(matches!(
            find_path(&store, &tree, ""),
            Err(TreeError::InvalidPath(_))
        ));
        assert!(matches!(
            find_path(&store, &tree, "a//b"),
            Err(TreeError::InvalidPath(_))
        ));
    }

    #[test]
    fn walker_emits_leaf_entries_in_name_order() {
        let store = InMemoryObjectStore::new();
        let tree = put_leaf(&store, &["c", "a", "b"]);
        let paths: Vec<String> = TreeWalker::new(&store, tree)
            .map(|r| r.unwrap().path)
            .collect();
        assert_eq!(paths, ["a", "b", "c"]);
    }

    #[test]
    fn walker_descends_named_subtrees() {
        let store = InMemoryObjectStore::new();
        let child = put_leaf(&store, &["r.1", "r.2"]);
        let root = RevTree::leaf(
            vec![
                node("standalone"),
                Node::tree("roads", child.id(), ObjectId::NULL),
            ],
            1,
            1,
        );
        store.put(&RevObject::Tree(root.clone())).unwrap();

        let features: Vec<String> = TreeWalker::new(&store, root.clone())
            .map(|r| r.unwrap().path)
            .collect();
        assert_eq!(features, ["roads/r.1", "roads/r.2", "standalone"]);

        let all: Vec<String> = TreeWalker::with_strategy(&store, root, WalkStrategy::All)
            .map(|r| r.unwrap().path)
            .collect();
        assert_eq!(all, ["roads", "roads/r.1", "roads/r.2", "standalone"]);
    }

    #[test]
    fn walker_flattens_bucketed_levels_into_name_order() {
        use crate::builder::TreeBuilder;

        let store = InMemoryObjectStore::new();
        let mut builder = TreeBuilder::empty(&store).with_threshold(8);
        for i in 0..30 {
            builder.put(node(&format!("f.{i:02}")));
        }
        let tree = builder.build().unwrap();
        assert!(tree.is_bucketed());

        let paths: Vec<String> = TreeWalker::new(&store, tree)
            .map(|r| r.unwrap().path)
            .collect();
        let mut sorted = paths.clone();
        sorted.sort_unstable();
        assert_eq!(paths, sorted);
        assert_eq!(paths.len(), 30);
    }

    #[test]
    fn trie_children_of_leaf_is_its_entries() {
        let store = InMemoryObjectStore::new();
        let tree = put_leaf(&store, &["b", "a"]);
        let children = trie_children(&store, &tree).unwrap();
        let names: Vec<&str> = children.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, ["a", "b"]);
    }

    #[test]
    fn total_size_descends_subtrees() {
        let store = InMemoryObjectStore::new();
        let child = put_leaf(&store, &["r.1", "r.2", "r.3"]);
        let root = RevTree::leaf(
            vec![node("x"), Node::tree("roads", child.id(), ObjectId::NULL)],
            1,
            1,
        );
        store.put(&RevObject::Tree(root.clone())).unwrap();
        assert_eq!(total_size(&store, &root).unwrap(), 4);
    }
}
