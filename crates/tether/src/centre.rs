//! The control centre tying transport, dispatch and addressing together.

use std::ffi::OsStr;
use std::net::SocketAddr;
use std::ops::ControlFlow;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::time::Duration;

use tracing::{debug, info, warn};

use tether_config::{Config, LogLevel};
use tether_protocol::{Command, Event, Response, encode_frame};

use crate::components::{ComponentPath, ComponentRegistry, ComponentTree, PathError};
use crate::dispatch::{
    CommandHandler, ComponentScope, DISPATCH_TARGET, DefaultCommandHandler, HandlerChain,
    HandlerId,
};
use crate::inspector::PathInspector;
use crate::telemetry::log_at;
use crate::transport::{Connection, Frame, FrameSink};

const CENTRE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::centre");

/// Owns the endpoint of one host application.
///
/// Frames arrive on a background thread and wait in a channel until the host
/// calls [`ControlCentre::process_pending`] (or
/// [`ControlCentre::wait_and_process`]) from its application thread. All
/// handlers run there, so they may touch the tree freely.
///
/// A centre without a port, or whose listener failed to bind, is *inert*: it
/// accepts handler and root registrations but never receives commands.
pub struct ControlCentre<T: ComponentTree + ?Sized> {
    log_level: LogLevel,
    handlers: HandlerChain<T>,
    registry: ComponentRegistry<T::Node>,
    endpoint: Option<Endpoint>,
}

struct Endpoint {
    sink: Box<dyn FrameSink>,
    frames: Receiver<Frame>,
    local_addr: Option<SocketAddr>,
}

impl<T: ComponentTree + ?Sized> std::fmt::Debug for ControlCentre<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlCentre")
            .field("log_level", &self.log_level)
            .field("handlers", &self.handlers)
            .field("registry", &self.registry)
            .field("active", &self.is_active())
            .field("local_addr", &self.local_addr())
            .finish()
    }
}

impl<T: ComponentTree + ?Sized> ControlCentre<T> {
    /// Creates a centre and, when a port is configured, starts listening.
    ///
    /// A port set in `config` wins, `0` included; otherwise `args` are
    /// scanned for `--e2e-test-port=<port>`. Without a port, or when binding fails, the
    /// centre is inert and the failure is logged.
    pub fn new<I, S>(config: &Config, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut centre = Self::inert(config.log_level());
        let Some(port) = config.resolve_port(args) else {
            debug!(target: CENTRE_TARGET, "no control port configured; endpoint disabled");
            return centre;
        };
        match start_connection(config.host(), port) {
            Ok((connection, frames)) => {
                let local_addr = connection.local_addr();
                centre.endpoint = Some(Endpoint {
                    sink: Box::new(connection),
                    frames,
                    local_addr: Some(local_addr),
                });
                info!(
                    target: CENTRE_TARGET,
                    addr = %local_addr,
                    "control endpoint ready; double-click a component to log its path"
                );
            }
            Err(error) => {
                warn!(
                    target: CENTRE_TARGET,
                    host = config.host(),
                    port,
                    error = %error,
                    "control endpoint disabled"
                );
            }
        }
        centre
    }

    /// Creates a centre from the process's own launch arguments.
    pub fn from_launch_args(config: &Config) -> Self {
        Self::new(config, std::env::args())
    }

    /// Creates a centre that never receives commands.
    pub fn inert(log_level: LogLevel) -> Self {
        let mut handlers = HandlerChain::default();
        handlers.add(Box::new(DefaultCommandHandler));
        Self {
            log_level,
            handlers,
            registry: ComponentRegistry::new(),
            endpoint: None,
        }
    }

    /// Creates a centre over a caller-supplied sink and frame source.
    ///
    /// Frames sent on the other end of `frames` are dispatched exactly as if
    /// they had arrived over TCP.
    pub fn with_sink(log_level: LogLevel, sink: Box<dyn FrameSink>, frames: Receiver<Frame>) -> Self {
        let mut centre = Self::inert(log_level);
        centre.endpoint = Some(Endpoint {
            sink,
            frames,
            local_addr: None,
        });
        centre
    }

    /// Appends a handler after every handler already registered.
    pub fn add_command_handler(&mut self, handler: impl CommandHandler<T> + 'static) -> HandlerId {
        self.handlers.add(Box::new(handler))
    }

    /// Removes a handler. Unknown ids are ignored.
    pub fn remove_command_handler(&mut self, id: HandlerId) -> bool {
        self.handlers.remove(id).is_some()
    }

    /// Registers a root component. Returns `false` if it already was one.
    pub fn add_root_component(&mut self, node: T::Node) -> bool {
        self.registry.add(node)
    }

    /// Unregisters a root component. Returns `false` if it was not one.
    pub fn remove_root_component(&mut self, node: T::Node) -> bool {
        self.registry.remove(node)
    }

    /// Registered roots.
    #[must_use]
    pub fn registry(&self) -> &ComponentRegistry<T::Node> {
        &self.registry
    }

    /// Path of `node`, or `None` when it is not under a registered root.
    pub fn component_path(&self, tree: &T, node: T::Node) -> Option<ComponentPath> {
        self.registry.component_path(tree, node)
    }

    /// Resolves a textual path against `tree`.
    ///
    /// # Errors
    ///
    /// Returns [`PathError`] when the path does not parse or matches nothing.
    pub fn resolve(&self, tree: &T, path: &str) -> Result<T::Node, PathError> {
        self.registry.resolve_str(tree, path)
    }

    /// Sends an event to the driver, or drops it when none is connected.
    pub fn send_event(&self, event: &Event) {
        let Some(endpoint) = self.endpoint.as_ref().filter(|endpoint| endpoint.sink.is_connected())
        else {
            debug!(target: CENTRE_TARGET, kind = event.kind(), "no peer; event dropped");
            return;
        };
        match encode_frame(event) {
            Ok(frame) => {
                log_at!(self.log_level, target: DISPATCH_TARGET, kind = event.kind(), "event sent");
                endpoint.sink.send(&frame);
            }
            Err(error) => {
                warn!(target: DISPATCH_TARGET, error = %error, "failed to encode event");
            }
        }
    }

    /// Dispatches every frame received so far.
    ///
    /// Frames left behind by a peer that has since been replaced are
    /// discarded. Returns [`ControlFlow::Break`] once a `quit` command has been answered;
    /// frames behind it stay queued.
    pub fn process_pending(&mut self, tree: &mut T) -> ControlFlow<()> {
        let Self {
            log_level,
            handlers,
            registry,
            endpoint,
        } = self;
        let Some(endpoint) = endpoint.as_ref() else {
            return ControlFlow::Continue(());
        };
        loop {
            match endpoint.frames.try_recv() {
                Ok(frame) => {
                    let mut scope = ComponentScope::new(tree, registry);
                    let flow = handle_frame(
                        *log_level,
                        handlers,
                        &mut scope,
                        endpoint.sink.as_ref(),
                        &frame,
                    );
                    if flow.is_break() {
                        return flow;
                    }
                }
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => {
                    return ControlFlow::Continue(());
                }
            }
        }
    }

    /// Waits up to `timeout` for a frame, then dispatches everything queued.
    ///
    /// Inert centres return immediately.
    pub fn wait_and_process(&mut self, tree: &mut T, timeout: Duration) -> ControlFlow<()> {
        let Self {
            log_level,
            handlers,
            registry,
            endpoint,
        } = self;
        let Some(endpoint) = endpoint.as_ref() else {
            return ControlFlow::Continue(());
        };
        match endpoint.frames.recv_timeout(timeout) {
            Ok(frame) => {
                let mut scope = ComponentScope::new(tree, registry);
                let flow =
                    handle_frame(*log_level, handlers, &mut scope, endpoint.sink.as_ref(), &frame);
                if flow.is_break() {
                    return flow;
                }
            }
            Err(RecvTimeoutError::Timeout) => return ControlFlow::Continue(()),
            Err(RecvTimeoutError::Disconnected) => {
                debug!(target: CENTRE_TARGET, "frame source closed");
                return ControlFlow::Continue(());
            }
        }
        self.process_pending(tree)
    }

    /// Returns `true` when the centre has a transport.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.endpoint.is_some()
    }

    /// Returns `true` while a driver is connected.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.endpoint
            .as_ref()
            .is_some_and(|endpoint| endpoint.sink.is_connected())
    }

    /// Address the endpoint listens on.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.endpoint.as_ref().and_then(|endpoint| endpoint.local_addr)
    }

    /// Verbosity used for protocol traffic.
    #[must_use]
    pub const fn log_level(&self) -> LogLevel {
        self.log_level
    }

    /// Path inspector logging at the centre's verbosity.
    #[must_use]
    pub fn inspector(&self) -> PathInspector<'_, T> {
        PathInspector::new(&self.registry, self.log_level)
    }
}

fn start_connection(
    host: &str,
    port: u16,
) -> Result<(Connection, Receiver<Frame>), crate::transport::TransportError> {
    let mut connection = Connection::bind(host, port)?;
    let (sender, frames) = mpsc::channel();
    connection.start(sender)?;
    Ok((connection, frames))
}

fn handle_frame<T: ComponentTree + ?Sized>(
    log_level: LogLevel,
    handlers: &mut HandlerChain<T>,
    scope: &mut ComponentScope<'_, T>,
    sink: &dyn FrameSink,
    frame: &Frame,
) -> ControlFlow<()> {
    if let Some(current) = sink.peer()
        && current != frame.peer()
    {
        debug!(
            target: DISPATCH_TARGET,
            peer = frame.peer(),
            current,
            "dropping frame from a departed peer"
        );
        return ControlFlow::Continue(());
    }
    let command = match Command::decode(frame.bytes()) {
        Ok(command) => command,
        Err(error) => {
            warn!(
                target: DISPATCH_TARGET,
                error = %error,
                frame = %String::from_utf8_lossy(frame.bytes()),
                "dropping invalid frame"
            );
            return ControlFlow::Continue(());
        }
    };
    log_at!(log_level, target: DISPATCH_TARGET, command = %command.describe(), "command received");

    let responders = handlers.dispatch(&command, scope, |response| {
        send_response(log_level, sink, &response);
    });
    if responders == 0 {
        send_response(log_level, sink, &Response::unhandled().with_uuid(command.uuid()));
        return ControlFlow::Continue(());
    }
    if command.is_quit() {
        info!(target: DISPATCH_TARGET, uuid = command.uuid(), "quit requested by driver");
        return ControlFlow::Break(());
    }
    ControlFlow::Continue(())
}

fn send_response(log_level: LogLevel, sink: &dyn FrameSink, response: &Response) {
    match encode_frame(response) {
        Ok(frame) => {
            log_at!(log_level, target: DISPATCH_TARGET, response = %response.describe(), "response sent");
            sink.send(&frame);
        }
        Err(error) => {
            warn!(target: DISPATCH_TARGET, error = %error, "failed to encode response");
        }
    }
}
