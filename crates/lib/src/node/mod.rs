//! The internal tree of a replicated document.
//!
//! Every point of the document is a [`Node`]. A node can hold named children
//! (object semantics), indexed children (array semantics) and a multi-value
//! register. In normal operation a node plays exactly one of those roles, but
//! nothing here enforces it.
//!
//! Each container owns its children by value, so the tree is a strict
//! ownership hierarchy: detaching a child drops its whole subtree.
//!
//! # Read contract
//!
//! A view layer renders the tree through [`Node::map_children`],
//! [`Node::list_children`] and [`Node::register`]. How a multi-value register
//! resolves to a single value is up to that layer.

use std::collections::{BTreeMap, BTreeSet, VecDeque, btree_map::Entry};

use serde::{Deserialize, Serialize};

use crate::{
    Value,
    document::DocumentError,
    op::{Cursor, CursorElement, MutationKey, MutationKind, OpId, Operation},
};


/// The key of a node within its parent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKey {
    /// Child of a map container
    Named(String),
    /// Child of a list container, keyed by the index it was created at
    Indexed(usize),
}

impl std::fmt::Display for NodeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeKey::Named(name) => write!(f, "{name}"),
            NodeKey::Indexed(index) => write!(f, "[{index}]"),
        }
    }
}

/// Counts gathered while walking a cursor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TraversalStats {
    /// Nodes visited below the starting node, including created ones
    pub touched: usize,
    /// Path nodes that did not exist and were linked during the walk; empty
    /// nodes padding a list are not counted
    pub created: usize,
}

/// A point in the document tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// `None` only for the root
    key: Option<NodeKey>,
    /// Ids of operations that created, traversed or mutated this node
    deps: BTreeSet<OpId>,
    /// Named children
    map: BTreeMap<String, Node>,
    /// Indexed children, in list order
    list: Vec<Node>,
    /// Concurrent scalar writes, keyed by the writing operation
    register: BTreeMap<OpId, Value>,
}

impl Node {
    /// Creates an empty root node.
    pub(crate) fn root() -> Self {
        Self::default()
    }

    fn child(key: NodeKey) -> Self {
        Self {
            key: Some(key),
            ..Self::default()
        }
    }

    /// This node's key in its parent, `None` for the root.
    pub fn key(&self) -> Option<&NodeKey> {
        self.key.as_ref()
    }

    /// Ids of the operations that touched this node.
    pub fn deps(&self) -> &BTreeSet<OpId> {
        &self.deps
    }

    /// Returns true if operation `id` touched this node.
    pub fn has_dep(&self, id: &OpId) -> bool {
        self.deps.contains(id)
    }

    /// Named children, in key order.
    pub fn map_children(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.map.iter().map(|(key, node)| (key.as_str(), node))
    }

    /// Indexed children, in list order.
    pub fn list_children(&self) -> &[Node] {
        &self.list
    }

    /// Register entries: writing operation id to value.
    pub fn register(&self) -> &BTreeMap<OpId, Value> {
        &self.register
    }

    /// The named child `name`, if present.
    pub fn child_named(&self, name: &str) -> Option<&Node> {
        self.map.get(name)
    }

    /// The child at list position `index`, if present.
    pub fn child_at(&self, index: usize) -> Option<&Node> {
        self.list.get(index)
    }

    /// Number of named plus indexed children.
    pub fn child_count(&self) -> usize {
        self.map.len() + self.list.len()
    }

    /// Returns true if the node has no children and an empty register.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty() && self.list.is_empty() && self.register.is_empty()
    }

    /// The child one cursor element below this node, if present.
    pub fn step(&self, element: &CursorElement) -> Option<&Node> {
        match element {
            CursorElement::MapKey(key) => self.map.get(key),
            CursorElement::ListKey(index) => self.list.get(*index),
        }
    }

    /// Looks up the node at `cursor` below this one without creating anything.
    pub fn get(&self, cursor: &Cursor) -> Option<&Node> {
        cursor.iter().try_fold(self, |node, element| node.step(element))
    }

    /// All descendants, breadth-first, named children before indexed ones.
    pub fn descendants(&self) -> Vec<&Node> {
        let mut out = Vec::new();
        let mut queue: VecDeque<&Node> = self.direct_children().collect();
        while let Some(node) = queue.pop_front() {
            queue.extend(node.direct_children());
            out.push(node);
        }
        out
    }

    fn direct_children(&self) -> impl Iterator<Item = &Node> {
        self.map.values().chain(self.list.iter())
    }

    /// Walks `cursor` from this node, creating any missing node on the way.
    ///
    /// Every node reached below `self`, existing or created, records `op` in
    /// its deps. The walk never fails: each element resolves to a node.
    pub(crate) fn traverse_mut(
        &mut self,
        cursor: &Cursor,
        op: &OpId,
    ) -> (&mut Node, TraversalStats) {
        let mut stats = TraversalStats::default();
        let mut current = self;
        for element in cursor {
            let (next, created) = current.child_or_link(element);
            if created {
                tracing::trace!(op_id = %op, key = %element, "Created node during traversal");
                stats.created += 1;
            }
            stats.touched += 1;
            next.add_dep(op);
            current = next;
        }
        (current, stats)
    }

    fn child_or_link(&mut self, element: &CursorElement) -> (&mut Node, bool) {
        match element {
            CursorElement::MapKey(key) => match self.map.entry(key.clone()) {
                Entry::Occupied(entry) => (entry.into_mut(), false),
                Entry::Vacant(entry) => {
                    let child = Node::child(NodeKey::Named(key.clone()));
                    (entry.insert(child), true)
                }
            },
            CursorElement::ListKey(index) => {
                let created = *index >= self.list.len();
                if created {
                    self.pad_list(*index);
                    self.list.push(Node::child(NodeKey::Indexed(*index)));
                }
                (&mut self.list[*index], created)
            }
        }
    }

    /// Fills the list with empty nodes up to, not including, `index`.
    ///
    /// Keeps a node reached through an index past the end at that index, so
    /// later cursors naming the same index find it.
    fn pad_list(&mut self, index: usize) {
        while self.list.len() < index {
            let position = self.list.len();
            self.list.push(Node::child(NodeKey::Indexed(position)));
        }
    }

    /// Creates an empty node keyed `key`, attaches it and returns it.
    ///
    /// Named children replace any existing child with the same name. Indexed
    /// children are inserted at their index, shifting later elements; an
    /// index past the end is clamped to the end and the node is keyed by the
    /// position it lands at.
    fn link(&mut self, key: NodeKey) -> &mut Node {
        match key {
            NodeKey::Indexed(index) => {
                let position = index.min(self.list.len());
                self.list
                    .insert(position, Node::child(NodeKey::Indexed(position)));
                &mut self.list[position]
            }
            NodeKey::Named(name) => {
                let child = Node::child(NodeKey::Named(name.clone()));
                match self.map.entry(name) {
                    Entry::Occupied(mut entry) => {
                        entry.insert(child);
                        entry.into_mut()
                    }
                    Entry::Vacant(entry) => entry.insert(child),
                }
            }
        }
    }

    pub(crate) fn add_dep(&mut self, op: &OpId) {
        self.deps.insert(op.clone());
    }

    /// Applies `op`'s mutation to this node.
    ///
    /// Only mutations that are malformed in themselves are rejected, so an
    /// operation fails the same way on every replica. A rejected mutation
    /// leaves this node untouched.
    pub(crate) fn mutate(&mut self, op: &Operation) -> Result<(), DocumentError> {
        let mutation = op.mutation();

        if let Err(reason) = mutation.validate() {
            return Err(DocumentError::InvalidMutation {
                op_id: op.id().clone(),
                reason,
            });
        }

        self.add_dep(op.id());

        match mutation.kind {
            MutationKind::Delete => {
                let cleared = self.clear_descendants();
                tracing::debug!(op_id = %op.id(), cleared, "Deleted subtree");
                return Ok(());
            }
            MutationKind::Assign => {
                let cleared = self.clear_descendants();
                if mutation.key.is_absent() {
                    // register entries the assign has causally seen are superseded
                    self.register.retain(|writer, _| !op.depends_on(writer));
                }
                tracing::debug!(op_id = %op.id(), cleared, "Cleared subtree for assign");
            }
            MutationKind::Insert => {}
        }

        match &mutation.key {
            MutationKey::Indexed(index) => {
                self.link(NodeKey::Indexed(*index)).write(op);
            }
            MutationKey::Named(name) => {
                self.link(NodeKey::Named(name.clone())).write(op);
            }
            MutationKey::Absent => {
                self.register
                    .insert(op.id().clone(), mutation.value.clone());
            }
        }
        Ok(())
    }

    fn write(&mut self, op: &Operation) {
        self.add_dep(op.id());
        self.register
            .insert(op.id().clone(), op.mutation().value.clone());
    }

    /// Detaches every descendant and returns how many there were.
    fn clear_descendants(&mut self) -> usize {
        let count = self.descendants().len();
        self.map.clear();
        self.list.clear();
        count
    }
}
