//! Registered roots and the path resolver built on them.

use std::collections::HashMap;
use std::hash::Hash;

use tracing::debug;

use super::path::{ComponentPath, PathError, PathToken};
use super::tree::ComponentTree;
use super::COMPONENTS_TARGET;

/// Ordered set of root nodes the endpoint can address.
///
/// Membership is a relation of identifiers; the registry never keeps nodes
/// alive. Roots that have left the tree are skipped when paths are rendered
/// or resolved.
///
/// Removal vacates a slot in O(1). Slots are compacted once vacancies
/// outnumber members.
#[derive(Debug, Clone)]
pub struct ComponentRegistry<N> {
    slots: Vec<Option<N>>,
    index: HashMap<N, usize>,
}

impl<N> Default for ComponentRegistry<N> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<N: Copy + Eq + Hash + std::fmt::Debug> ComponentRegistry<N> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `node` as a root. Returns `false` if it was already present.
    pub fn add(&mut self, node: N) -> bool {
        if self.index.contains_key(&node) {
            return false;
        }
        self.index.insert(node, self.slots.len());
        self.slots.push(Some(node));
        debug!(target: COMPONENTS_TARGET, ?node, "root registered");
        true
    }

    /// Unregisters `node`. Returns `false` if it was not registered.
    pub fn remove(&mut self, node: N) -> bool {
        let Some(slot) = self.index.remove(&node) else {
            return false;
        };
        if let Some(entry) = self.slots.get_mut(slot) {
            *entry = None;
        }
        if self.slots.len() > self.index.len().saturating_mul(2) {
            self.compact();
        }
        debug!(target: COMPONENTS_TARGET, ?node, "root removed");
        true
    }

    fn compact(&mut self) {
        self.slots.retain(Option::is_some);
        for (slot, entry) in self.slots.iter().enumerate() {
            if let Some(node) = entry {
                self.index.insert(*node, slot);
            }
        }
    }

    /// Returns `true` if `node` is a registered root.
    #[must_use]
    pub fn contains(&self, node: N) -> bool {
        self.index.contains_key(&node)
    }

    /// Registered roots in registration order, alive or not.
    pub fn roots(&self) -> impl Iterator<Item = N> + '_ {
        self.slots.iter().flatten().copied()
    }

    /// Number of registered roots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Returns `true` when no root is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Registered roots still alive in `tree`, in registration order.
    pub fn live_roots<T>(&self, tree: &T) -> Vec<N>
    where
        T: ComponentTree<Node = N> + ?Sized,
    {
        self.roots().filter(|root| tree.contains(*root)).collect()
    }

    /// Renders the path of `node` relative to its nearest registered root.
    ///
    /// Returns `None` when the node is dead or has no registered ancestor.
    pub fn component_path<T>(&self, tree: &T, node: N) -> Option<ComponentPath>
    where
        T: ComponentTree<Node = N> + ?Sized,
    {
        if !tree.contains(node) {
            return None;
        }
        let mut chain = vec![node];
        let mut current = node;
        while !self.contains(current) {
            current = tree.parent(current)?;
            chain.push(current);
        }
        chain.reverse();

        let mut tokens = Vec::with_capacity(chain.len());
        let mut siblings = self.live_roots(tree);
        for link in chain {
            tokens.push(token_among(tree, &siblings, link)?);
            siblings = tree.children(link);
        }
        ComponentPath::from_tokens(tokens)
    }

    /// Finds the node addressed by `path`.
    ///
    /// # Errors
    ///
    /// Returns [`PathError::NotFound`] naming the first token that matches no
    /// live node.
    pub fn resolve<T>(&self, tree: &T, path: &ComponentPath) -> Result<N, PathError>
    where
        T: ComponentTree<Node = N> + ?Sized,
    {
        let mut siblings = self.live_roots(tree);
        let mut found = None;
        for token in path.tokens() {
            let node = select(tree, &siblings, token)
                .ok_or_else(|| PathError::not_found(path, token))?;
            siblings = tree.children(node);
            found = Some(node);
        }
        found.ok_or(PathError::Empty)
    }

    /// Parses and resolves a textual path.
    ///
    /// # Errors
    ///
    /// Returns [`PathError`] when the text does not parse or matches nothing.
    pub fn resolve_str<T>(&self, tree: &T, path: &str) -> Result<N, PathError>
    where
        T: ComponentTree<Node = N> + ?Sized,
    {
        self.resolve(tree, &path.parse()?)
    }
}

/// Token identifying `node` among `siblings`.
fn token_among<T>(tree: &T, siblings: &[T::Node], node: T::Node) -> Option<PathToken>
where
    T: ComponentTree + ?Sized,
{
    let position = siblings.iter().position(|sibling| *sibling == node)?;
    let Some(name) = tree.name(node).filter(|name| !name.is_empty()) else {
        return Some(PathToken::Position(position));
    };
    let occurrence = siblings
        .iter()
        .take(position)
        .filter(|sibling| tree.name(**sibling) == Some(name))
        .count();
    Some(PathToken::Named {
        name: name.to_owned(),
        occurrence,
    })
}

fn select<T>(tree: &T, siblings: &[T::Node], token: &PathToken) -> Option<T::Node>
where
    T: ComponentTree + ?Sized,
{
    match token {
        PathToken::Named { name, occurrence } => siblings
            .iter()
            .copied()
            .filter(|sibling| tree.name(*sibling) == Some(name.as_str()))
            .nth(*occurrence),
        PathToken::Position(position) => siblings.get(*position).copied(),
    }
}
