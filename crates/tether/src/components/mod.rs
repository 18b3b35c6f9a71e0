//! Component addressing.
//!
//! Embedding code registers root nodes of its UI tree. The registry renders
//! any node below a root as a stable, human-readable path and resolves such
//! paths back to live nodes.

mod memory;
mod path;
mod registry;
mod tree;

pub use self::memory::{MemoryTree, NodeId};
pub use self::path::{ComponentPath, PATH_DELIMITER, PathError, PathToken};
pub use self::registry::ComponentRegistry;
pub use self::tree::ComponentTree;

const COMPONENTS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::components");
