//! The demo window and the commands it answers.
//!
//! The window is a small in-memory tree:
//!
//! ```text
//! MainWindow
//! ├── toolbar
//! │   ├── Open
//! │   └── Save
//! └── (unnamed form)
//!     ├── (unnamed text field)
//!     └── (unnamed text field)
//! ```
//!
//! so both named (`MainWindow/toolbar/Save`) and positional
//! (`MainWindow/1/0`) paths have something to resolve.

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::Value;
use tether::components::{MemoryTree, NodeId};
use tether::dispatch::{CommandHandler, ComponentScope};
use tether::{Command, Event, Response};

/// Presses the component at `path` and reports the click count.
pub(crate) const CLICK_COMMAND: &str = "click";
/// Reads the `text` property of the component at `path`.
pub(crate) const GET_TEXT_COMMAND: &str = "get-text";
/// Writes `text` into the component at `path`.
pub(crate) const SET_TEXT_COMMAND: &str = "set-text";
/// Event emitted after every click.
pub(crate) const CLICKED_EVENT: &str = "clicked";

const CLICKS_PROPERTY: &str = "clicks";
const TEXT_PROPERTY: &str = "text";

/// Builds the window and returns its root.
pub(crate) fn build(tree: &mut MemoryTree) -> Option<NodeId> {
    let window = tree.create_node(Some("MainWindow"));
    let toolbar = tree.create_child(window, Some("toolbar"))?;
    tree.create_child(toolbar, Some("Open"))?;
    tree.create_child(toolbar, Some("Save"))?;
    let form = tree.create_child(window, None)?;
    for _ in 0..2 {
        let field = tree.create_child(form, None)?;
        tree.set_property(field, TEXT_PROPERTY, Value::from(""));
    }
    Some(window)
}

/// Events raised by handlers, waiting for the event loop to send them.
pub(crate) type Outbox = Rc<RefCell<Vec<Event>>>;

/// Answers the widget commands of the demo window.
#[derive(Debug)]
pub(crate) struct WidgetHandler {
    outbox: Outbox,
}

impl WidgetHandler {
    pub(crate) fn new(outbox: Outbox) -> Self {
        Self { outbox }
    }

    fn click(&self, command: &Command, scope: &mut ComponentScope<'_, MemoryTree>) -> Response {
        let (node, path) = match target(command, scope) {
            Ok(found) => found,
            Err(response) => return response,
        };
        let clicks = scope
            .tree()
            .property(node, CLICKS_PROPERTY)
            .and_then(Value::as_u64)
            .unwrap_or(0)
            .saturating_add(1);
        scope
            .tree_mut()
            .set_property(node, CLICKS_PROPERTY, Value::from(clicks));
        self.outbox.borrow_mut().push(
            Event::new(CLICKED_EVENT)
                .with_field("path", path)
                .with_field(CLICKS_PROPERTY, clicks),
        );
        Response::ok().with_field(CLICKS_PROPERTY, clicks)
    }
}

impl CommandHandler<MemoryTree> for WidgetHandler {
    fn process(
        &mut self,
        command: &Command,
        scope: &mut ComponentScope<'_, MemoryTree>,
    ) -> Option<Response> {
        let response = match command.kind() {
            CLICK_COMMAND => self.click(command, scope),
            GET_TEXT_COMMAND => get_text(command, scope),
            SET_TEXT_COMMAND => set_text(command, scope),
            _ => return None,
        };
        Some(response)
    }
}

/// Resolves the `path` argument to a node and its canonical path.
fn target(
    command: &Command,
    scope: &ComponentScope<'_, MemoryTree>,
) -> Result<(NodeId, String), Response> {
    let path = command
        .argument::<String>("path")
        .map_err(|error| Response::fail(error.to_string()))?;
    let node = scope
        .resolve(&path)
        .map_err(|error| Response::fail(error.to_string()))?;
    let canonical = scope.path_of(node).map_or(path, |found| found.to_string());
    Ok((node, canonical))
}

fn get_text(command: &Command, scope: &ComponentScope<'_, MemoryTree>) -> Response {
    match target(command, scope) {
        Ok((node, _)) => {
            let text = scope
                .tree()
                .property(node, TEXT_PROPERTY)
                .cloned()
                .unwrap_or(Value::Null);
            Response::ok().with_field(TEXT_PROPERTY, text)
        }
        Err(response) => response,
    }
}

fn set_text(command: &Command, scope: &mut ComponentScope<'_, MemoryTree>) -> Response {
    let (node, _) = match target(command, scope) {
        Ok(found) => found,
        Err(response) => return response,
    };
    match command.argument::<String>(TEXT_PROPERTY) {
        Ok(text) => {
            scope
                .tree_mut()
                .set_property(node, TEXT_PROPERTY, Value::from(text));
            Response::ok()
        }
        Err(error) => Response::fail(error.to_string()),
    }
}
