//! Demo host application embedding a tether control endpoint.
//!
//! Start it with `--e2e-test-port <port>` (plus `--log-level`,
//! `--log-format`, `--log-filter` or `--host`, or their `TETHER_*`
//! environment equivalents) and drive it with the `tether-driver` crate.
//! It answers `click`, `get-text` and `set-text` besides the built-in
//! commands, emits a `clicked` event after each click and exits on `quit`,
//! SIGINT or SIGTERM.

mod window;

use std::io::{self, Write};
use std::ops::ControlFlow;
use std::process::ExitCode;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use signal_hook::consts::signal::{SIGINT, SIGTERM};
use tether::components::MemoryTree;
use tether::telemetry::{self, TelemetryError};
use tether::{Config, ControlCentre};
use tether_config::ConfigError;
use thiserror::Error;
use tracing::info;

use crate::window::{Outbox, WidgetHandler};

const DEMO_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::main");
const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Failures that stop the demo before its event loop starts.
#[derive(Debug, Error)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to initialise telemetry: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("failed to install signal handlers: {0}")]
    Signals(#[source] io::Error),
    #[error("failed to build the demo window")]
    Window,
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            let mut stderr = io::stderr().lock();
            writeln!(stderr, "tetherd-demo: {error}").ok();
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), StartupError> {
    let config = Config::load_layered(std::env::args_os())?;
    telemetry::initialise(&config)?;

    let stop = Arc::new(AtomicBool::new(false));
    for signal in [SIGINT, SIGTERM] {
        signal_hook::flag::register(signal, Arc::clone(&stop)).map_err(StartupError::Signals)?;
    }

    let mut tree = MemoryTree::new();
    let root = window::build(&mut tree).ok_or(StartupError::Window)?;
    let mut centre: ControlCentre<MemoryTree> = ControlCentre::new(&config, std::env::args_os());
    centre.add_root_component(root);
    let outbox = Outbox::default();
    centre.add_command_handler(WidgetHandler::new(Rc::clone(&outbox)));

    while !stop.load(Ordering::Relaxed) {
        let flow = centre.wait_and_process(&mut tree, FRAME_INTERVAL);
        for event in outbox.borrow_mut().drain(..) {
            centre.send_event(&event);
        }
        if flow == ControlFlow::Break(()) {
            info!(target: DEMO_TARGET, "quit requested by driver");
            return Ok(());
        }
    }
    info!(target: DEMO_TARGET, "stopped by signal");
    Ok(())
}
