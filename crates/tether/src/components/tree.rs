//! Host tree abstraction.

use std::fmt::Debug;
use std::hash::Hash;

/// Read access to the host application's live UI tree.
///
/// The endpoint never owns nodes. It refers to them through cheap identifiers
/// and asks the tree about their shape whenever a path is rendered or
/// resolved, so paths always reflect the tree as it is at that moment.
pub trait ComponentTree {
    /// Identifier of a node in the tree.
    type Node: Copy + Eq + Hash + Debug;

    /// Returns `true` while `node` is alive.
    fn contains(&self, node: Self::Node) -> bool;

    /// Parent of `node`, or `None` for top-level nodes.
    fn parent(&self, node: Self::Node) -> Option<Self::Node>;

    /// Children of `node` in their display order.
    fn children(&self, node: Self::Node) -> Vec<Self::Node>;

    /// Declared name of `node`, if any.
    fn name(&self, node: Self::Node) -> Option<&str>;
}
