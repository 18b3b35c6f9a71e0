//! Built-in handler answering quit and component-addressing queries.

use serde_json::Value;
use tether_protocol::{Command, QUIT_COMMAND, Response};

use super::handler::{CommandHandler, ComponentScope};
use crate::components::{ComponentTree, PathError};

/// Reports whether a path resolves: `{"exists": bool}`.
pub const COMPONENT_EXISTS_COMMAND: &str = "component-exists";
/// Canonicalises a path: `{"path": "..."}`.
pub const GET_COMPONENT_PATH_COMMAND: &str = "get-component-path";
/// Lists child paths: `{"children": [...]}`.
pub const LIST_CHILDREN_COMMAND: &str = "list-children";
/// Lists root paths: `{"roots": [...]}`.
pub const LIST_ROOTS_COMMAND: &str = "list-roots";

const PATH_ARGUMENT: &str = "path";

/// Handler registered first on every control centre.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultCommandHandler;

impl<T: ComponentTree + ?Sized> CommandHandler<T> for DefaultCommandHandler {
    fn process(&mut self, command: &Command, scope: &mut ComponentScope<'_, T>) -> Option<Response> {
        let response = match command.kind() {
            QUIT_COMMAND => Response::ok(),
            COMPONENT_EXISTS_COMMAND => component_exists(command, scope),
            GET_COMPONENT_PATH_COMMAND => canonical_path(command, scope),
            LIST_CHILDREN_COMMAND => list_children(command, scope),
            LIST_ROOTS_COMMAND => list_roots(scope),
            _ => return None,
        };
        Some(response)
    }
}

fn path_argument(command: &Command) -> Result<String, Response> {
    command
        .argument::<String>(PATH_ARGUMENT)
        .map_err(|error| Response::fail(error.to_string()))
}

fn resolve<T: ComponentTree + ?Sized>(
    command: &Command,
    scope: &ComponentScope<'_, T>,
) -> Result<T::Node, Response> {
    let path = path_argument(command)?;
    scope
        .resolve(&path)
        .map_err(|error| Response::fail(error.to_string()))
}

fn component_exists<T: ComponentTree + ?Sized>(
    command: &Command,
    scope: &ComponentScope<'_, T>,
) -> Response {
    let path = match path_argument(command) {
        Ok(path) => path,
        Err(response) => return response,
    };
    match scope.resolve(&path) {
        Ok(_) => Response::ok().with_field("exists", true),
        Err(PathError::NotFound { .. }) => Response::ok().with_field("exists", false),
        Err(error) => Response::fail(error.to_string()),
    }
}

fn canonical_path<T: ComponentTree + ?Sized>(
    command: &Command,
    scope: &ComponentScope<'_, T>,
) -> Response {
    let node = match resolve(command, scope) {
        Ok(node) => node,
        Err(response) => return response,
    };
    scope.path_of(node).map_or_else(
        || Response::fail("component is not addressable"),
        |path| Response::ok().with_field("path", path.to_string()),
    )
}

fn list_children<T: ComponentTree + ?Sized>(
    command: &Command,
    scope: &ComponentScope<'_, T>,
) -> Response {
    let node = match resolve(command, scope) {
        Ok(node) => node,
        Err(response) => return response,
    };
    let children = scope
        .tree()
        .children(node)
        .into_iter()
        .filter_map(|child| scope.path_of(child))
        .map(|path| Value::from(path.to_string()))
        .collect::<Vec<_>>();
    Response::ok().with_field("children", children)
}

fn list_roots<T: ComponentTree + ?Sized>(scope: &ComponentScope<'_, T>) -> Response {
    let roots = scope
        .registry()
        .live_roots(scope.tree())
        .into_iter()
        .filter_map(|root| scope.path_of(root))
        .map(|path| Value::from(path.to_string()))
        .collect::<Vec<_>>();
    Response::ok().with_field("roots", roots)
}
