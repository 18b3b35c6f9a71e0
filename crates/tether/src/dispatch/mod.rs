//! Command dispatch.
//!
//! Valid commands are offered to every registered handler in registration
//! order. Dispatch never stops at the first responder: each response is sent
//! as it is produced, and a command nobody answers gets a synthetic
//! "Unhandled message" failure.

mod chain;
mod default_handler;
mod handler;

pub use self::chain::{HandlerChain, HandlerId};
pub use self::default_handler::{
    COMPONENT_EXISTS_COMMAND, DefaultCommandHandler, GET_COMPONENT_PATH_COMMAND,
    LIST_CHILDREN_COMMAND, LIST_ROOTS_COMMAND,
};
pub use self::handler::{CommandHandler, ComponentScope};

pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");
