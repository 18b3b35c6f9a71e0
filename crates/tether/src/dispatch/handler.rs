//! Command handler seam and the scope handlers operate in.

use tether_protocol::{Command, Response};

use crate::components::{ComponentPath, ComponentRegistry, ComponentTree, PathError};

/// Capability answering commands.
///
/// Every registered handler sees every valid command. Returning `None` means
/// the command is not for this handler; returning a response means it is
/// sent back to the driver, stamped with the command's uuid.
pub trait CommandHandler<T: ComponentTree + ?Sized> {
    /// Handles `command`, optionally producing a response.
    fn process(&mut self, command: &Command, scope: &mut ComponentScope<'_, T>) -> Option<Response>;
}

/// Live tree plus root registry, lent to handlers for one dispatch.
#[derive(Debug)]
pub struct ComponentScope<'a, T: ComponentTree + ?Sized> {
    tree: &'a mut T,
    registry: &'a ComponentRegistry<T::Node>,
}

impl<'a, T: ComponentTree + ?Sized> ComponentScope<'a, T> {
    /// Lends `tree` and `registry` to handlers.
    pub fn new(tree: &'a mut T, registry: &'a ComponentRegistry<T::Node>) -> Self {
        Self { tree, registry }
    }

    /// The host tree.
    #[must_use]
    pub fn tree(&self) -> &T {
        self.tree
    }

    /// The host tree, mutably.
    pub fn tree_mut(&mut self) -> &mut T {
        self.tree
    }

    /// The registered roots.
    #[must_use]
    pub fn registry(&self) -> &ComponentRegistry<T::Node> {
        self.registry
    }

    /// Resolves a textual path to a live node.
    ///
    /// # Errors
    ///
    /// Returns [`PathError`] when the path does not parse or matches nothing.
    pub fn resolve(&self, path: &str) -> Result<T::Node, PathError> {
        self.registry.resolve_str(&*self.tree, path)
    }

    /// Renders the path of `node`, or `None` when it is not addressable.
    #[must_use]
    pub fn path_of(&self, node: T::Node) -> Option<ComponentPath> {
        self.registry.component_path(&*self.tree, node)
    }
}
