//! Ordered handler list with fan-out dispatch.

use std::fmt;

use tether_protocol::{Command, Response};

use super::handler::{CommandHandler, ComponentScope};
use crate::components::ComponentTree;

/// Identity of a registered handler, used to remove it again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

/// Handlers in registration order.
pub struct HandlerChain<T: ComponentTree + ?Sized> {
    handlers: Vec<(HandlerId, Box<dyn CommandHandler<T>>)>,
    next_id: u64,
}

impl<T: ComponentTree + ?Sized> Default for HandlerChain<T> {
    fn default() -> Self {
        Self {
            handlers: Vec::new(),
            next_id: 0,
        }
    }
}

impl<T: ComponentTree + ?Sized> fmt::Debug for HandlerChain<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerChain")
            .field("handlers", &self.ids().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl<T: ComponentTree + ?Sized> HandlerChain<T> {
    /// Appends a handler and returns its identity.
    pub fn add(&mut self, handler: Box<dyn CommandHandler<T>>) -> HandlerId {
        let id = HandlerId(self.next_id);
        self.next_id += 1;
        self.handlers.push((id, handler));
        id
    }

    /// Removes the handler registered as `id`, if still present.
    pub fn remove(&mut self, id: HandlerId) -> Option<Box<dyn CommandHandler<T>>> {
        let index = self.handlers.iter().position(|(entry, _)| *entry == id)?;
        Some(self.handlers.remove(index).1)
    }

    /// Identities in dispatch order.
    pub fn ids(&self) -> impl Iterator<Item = HandlerId> + '_ {
        self.handlers.iter().map(|(id, _)| *id)
    }

    /// Number of registered handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns `true` when no handler is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Offers `command` to every handler in order.
    ///
    /// Each response is stamped with the command's uuid and passed to `emit`
    /// as soon as it is produced. Returns how many handlers responded.
    pub fn dispatch(
        &mut self,
        command: &Command,
        scope: &mut ComponentScope<'_, T>,
        mut emit: impl FnMut(Response),
    ) -> usize {
        let mut responders = 0;
        for (_, handler) in &mut self.handlers {
            if let Some(response) = handler.process(command, scope) {
                responders += 1;
                emit(response.with_uuid(command.uuid()));
            }
        }
        responders
    }
}
