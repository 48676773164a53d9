//! Arena-backed node tree
//!
//! Nodes live in a slot vector and refer to each other by [`NodeKey`].
//! A parent owns its children list; the child only stores a back-reference.
//! Sibling identity `(type, value)` is indexed per parent so matching during
//! reconciliation never scans the tree.

use crate::hash::NodeId;
use ahash::AHashMap;
use serde_json::Value;
use smallvec::SmallVec;

/// Index of a node in the arena
///
/// Keys are only meaningful for the tree that issued them and may be reused
/// after the node is pruned. Use [`NodeId`] for anything that outlives a
/// refresh cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey(u32);

impl NodeKey {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A tree node
#[derive(Debug, Clone)]
pub struct Node {
    /// Property path of the producing field descriptor (the node "kind")
    pub kind: String,
    /// Raw resolved value
    pub value: Value,
    /// Canonical string of `value`; identity among siblings
    pub value_key: String,
    pub label: String,
    pub icon: Option<String>,
    pub tooltip: Option<String>,
    pub id: NodeId,
    /// Schema level (0 = root)
    pub level: usize,
    pub parent: Option<NodeKey>,
    pub children: SmallVec<[NodeKey; 4]>,
    pub changed: bool,
    pub tracks_changes: bool,
    pub has_context_menu: bool,
    /// Entity keys of the records that produced this node in the last cycle
    pub entities: SmallVec<[String; 1]>,
    /// Derived from the filter state; recomputed after every mutation
    pub visible: bool,
    pub(crate) marked_for_deletion: bool,
}

impl Node {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn has_entity(&self, key: &str) -> bool {
        self.entities.iter().any(|e| e == key)
    }

    pub(crate) fn add_entity(&mut self, key: &str) {
        if !self.has_entity(key) {
            self.entities.push(key.to_string());
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct IdentityKey {
    parent: Option<NodeKey>,
    kind: String,
    value: String,
}

/// The node arena plus root list and lookup indexes
#[derive(Debug, Default)]
pub struct Tree {
    slots: Vec<Option<Node>>,
    free: Vec<u32>,
    roots: Vec<NodeKey>,
    identity: AHashMap<IdentityKey, NodeKey>,
    by_id: AHashMap<NodeId, NodeKey>,
}

impl Tree {
    /// Create a new empty tree
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live nodes
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn roots(&self) -> &[NodeKey] {
        &self.roots
    }

    pub fn get(&self, key: NodeKey) -> Option<&Node> {
        self.slots.get(key.index()).and_then(Option::as_ref)
    }

    pub(crate) fn get_mut(&mut self, key: NodeKey) -> Option<&mut Node> {
        self.slots.get_mut(key.index()).and_then(Option::as_mut)
    }

    /// Children of `key` (empty for unknown keys)
    pub fn children(&self, key: NodeKey) -> &[NodeKey] {
        self.get(key).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn parent(&self, key: NodeKey) -> Option<NodeKey> {
        self.get(key).and_then(|n| n.parent)
    }

    /// Look a node up by its stable id
    pub fn find_id(&self, id: &str) -> Option<NodeKey> {
        self.by_id.get(id).copied()
    }

    /// Find the sibling with identity `(kind, value_key)` under `parent`
    pub fn find(&self, parent: Option<NodeKey>, kind: &str, value_key: &str) -> Option<NodeKey> {
        self.identity
            .get(&IdentityKey {
                parent,
                kind: kind.to_string(),
                value: value_key.to_string(),
            })
            .copied()
    }

    /// Iterate live nodes in arena order
    pub fn iter(&self) -> impl Iterator<Item = (NodeKey, &Node)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|n| (NodeKey(i as u32), n)))
    }

    /// Keys of all descendants of `key`, depth-first, excluding `key`
    pub fn descendants(&self, key: NodeKey) -> Vec<NodeKey> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeKey> = self.children(key).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    /// Insert a node under its `parent` (or as a root)
    ///
    /// The caller guarantees no sibling already has the same identity.
    pub(crate) fn insert(&mut self, node: Node) -> NodeKey {
        let identity = IdentityKey {
            parent: node.parent,
            kind: node.kind.clone(),
            value: node.value_key.clone(),
        };
        let id = node.id.clone();
        let parent = node.parent;

        let key = match self.free.pop() {
            Some(slot) => {
                self.slots[slot as usize] = Some(node);
                NodeKey(slot)
            }
            None => {
                self.slots.push(Some(node));
                NodeKey((self.slots.len() - 1) as u32)
            }
        };

        match parent.and_then(|p| self.get_mut(p)) {
            Some(parent) => parent.children.push(key),
            None => self.roots.push(key),
        }
        self.identity.insert(identity, key);
        self.by_id.insert(id, key);
        key
    }

    /// Flag every node for deletion and forget last cycle's entities
    pub(crate) fn mark_all(&mut self) {
        for node in self.slots.iter_mut().flatten() {
            node.marked_for_deletion = true;
            node.entities.clear();
        }
    }

    /// Remove every node still marked for deletion
    ///
    /// Children lists are filtered bottom-up: a node's children are pruned
    /// before the node itself is judged, and a node is removed only when it
    /// was not matched this cycle. Returns the removed nodes.
    pub(crate) fn remove_marked(&mut self) -> Vec<Node> {
        let mut removed = Vec::new();
        let roots = std::mem::take(&mut self.roots);
        self.roots = self.prune_list(roots, &mut removed);
        removed
    }

    fn prune_list(&mut self, list: Vec<NodeKey>, removed: &mut Vec<Node>) -> Vec<NodeKey> {
        let mut kept = Vec::with_capacity(list.len());
        for key in list {
            let children = match self.get_mut(key) {
                Some(node) => std::mem::take(&mut node.children),
                None => continue,
            };
            let children = self.prune_list(children.into_vec(), removed);

            let marked = self.get(key).is_some_and(|n| n.marked_for_deletion);
            if marked {
                for child in children {
                    self.remove_subtree(child, removed);
                }
                if let Some(node) = self.take(key) {
                    removed.push(node);
                }
            } else {
                if let Some(node) = self.get_mut(key) {
                    node.children = children.into();
                }
                kept.push(key);
            }
        }
        kept
    }

    fn remove_subtree(&mut self, key: NodeKey, removed: &mut Vec<Node>) {
        let children = self.children(key).to_vec();
        for child in children {
            self.remove_subtree(child, removed);
        }
        if let Some(node) = self.take(key) {
            removed.push(node);
        }
    }

    fn take(&mut self, key: NodeKey) -> Option<Node> {
        let node = self.slots.get_mut(key.index())?.take()?;
        self.identity.remove(&IdentityKey {
            parent: node.parent,
            kind: node.kind.clone(),
            value: node.value_key.clone(),
        });
        self.by_id.remove(&node.id);
        self.free.push(key.0);
        Some(node)
    }

    /// Sort roots and every children list by label
    ///
    /// Case-sensitive lexical order; the sort is stable so equal labels keep
    /// their insertion order.
    pub(crate) fn sort_by_label(&mut self) {
        let mut roots = std::mem::take(&mut self.roots);
        self.sort_keys(&mut roots);
        self.roots = roots;

        for index in 0..self.slots.len() {
            let Some(mut children) = self.slots[index]
                .as_mut()
                .map(|n| std::mem::take(&mut n.children))
            else {
                continue;
            };
            self.sort_keys(&mut children);
            if let Some(node) = self.slots[index].as_mut() {
                node.children = children;
            }
        }
    }

    fn sort_keys(&self, keys: &mut [NodeKey]) {
        keys.sort_by(|a, b| {
            let a = self.get(*a).map(|n| n.label.as_str()).unwrap_or("");
            let b = self.get(*b).map(|n| n.label.as_str()).unwrap_or("");
            a.cmp(b)
        });
    }

    /// Drop every node
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
