//! In-memory component tree.
//!
//! Used by headless hosts and tests. Nodes carry an optional name and a bag
//! of JSON properties standing in for widget state.

use std::collections::HashMap;

use serde_json::{Map, Value};

use super::tree::ComponentTree;

/// Identifier of a node in a [`MemoryTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

#[derive(Debug, Default)]
struct NodeData {
    name: Option<String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    properties: Map<String, Value>,
}

/// Owning tree of named nodes.
#[derive(Debug, Default)]
pub struct MemoryTree {
    nodes: HashMap<NodeId, NodeData>,
    next_id: u64,
}

impl MemoryTree {
    /// Creates an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a detached node.
    pub fn create_node(&mut self, name: Option<&str>) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(
            id,
            NodeData {
                name: name.map(str::to_owned),
                ..NodeData::default()
            },
        );
        id
    }

    /// Creates a node and appends it under `parent`.
    ///
    /// Returns `None` when `parent` is not alive.
    pub fn create_child(&mut self, parent: NodeId, name: Option<&str>) -> Option<NodeId> {
        if !self.nodes.contains_key(&parent) {
            return None;
        }
        let child = self.create_node(name);
        self.append_child(parent, child).then_some(child)
    }

    /// Moves `child` to the end of `parent`'s children.
    ///
    /// Returns `false` if either node is dead or the move would create a
    /// cycle.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        if !self.nodes.contains_key(&parent)
            || !self.nodes.contains_key(&child)
            || self.is_ancestor_or_self(child, parent)
        {
            return false;
        }
        self.detach(child);
        if let Some(data) = self.nodes.get_mut(&child) {
            data.parent = Some(parent);
        }
        if let Some(data) = self.nodes.get_mut(&parent) {
            data.children.push(child);
        }
        true
    }

    /// Removes `node` and its whole subtree. Returns `false` if it was dead.
    pub fn remove_node(&mut self, node: NodeId) -> bool {
        if !self.nodes.contains_key(&node) {
            return false;
        }
        self.detach(node);
        let mut pending = vec![node];
        while let Some(current) = pending.pop() {
            if let Some(data) = self.nodes.remove(&current) {
                pending.extend(data.children);
            }
        }
        true
    }

    /// Replaces the declared name of `node`.
    pub fn set_name(&mut self, node: NodeId, name: Option<&str>) {
        if let Some(data) = self.nodes.get_mut(&node) {
            data.name = name.map(str::to_owned);
        }
    }

    /// Reads a property of `node`.
    #[must_use]
    pub fn property(&self, node: NodeId, key: &str) -> Option<&Value> {
        self.nodes.get(&node)?.properties.get(key)
    }

    /// Sets a property of `node`. Returns `false` if the node is dead.
    pub fn set_property(&mut self, node: NodeId, key: impl Into<String>, value: Value) -> bool {
        let Some(data) = self.nodes.get_mut(&node) else {
            return false;
        };
        data.properties.insert(key.into(), value);
        true
    }

    /// Number of live nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` when the tree holds no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn detach(&mut self, node: NodeId) {
        let Some(parent) = self.nodes.get_mut(&node).and_then(|data| data.parent.take()) else {
            return;
        };
        if let Some(data) = self.nodes.get_mut(&parent) {
            data.children.retain(|child| *child != node);
        }
    }

    fn is_ancestor_or_self(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.nodes.get(&id).and_then(|data| data.parent);
        }
        false
    }
}

impl ComponentTree for MemoryTree {
    type Node = NodeId;

    fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains_key(&node)
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(&node)?.parent
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes
            .get(&node)
            .map(|data| data.children.clone())
            .unwrap_or_default()
    }

    fn name(&self, node: NodeId) -> Option<&str> {
        self.nodes.get(&node)?.name.as_deref()
    }
}
