//! In-process control endpoint for end-to-end tests of GUI applications.
//!
//! A host application embeds a [`ControlCentre`], registers the roots of its
//! UI tree and any command handlers it provides, and calls
//! [`ControlCentre::process_pending`] from its event loop. A test driver
//! connects over TCP (see the `tether-driver` crate), sends JSON commands and
//! receives correlated responses plus uncorrelated events.
//!
//! UI elements are addressed by paths such as `MainWindow/toolbar/Save` or
//! `R2/0/1`, derived from the live tree by the [`components`] module.

pub mod components;
pub mod dispatch;
pub mod telemetry;
pub mod transport;

mod centre;
mod inspector;

#[cfg(test)]
mod tests;

pub use centre::ControlCentre;
pub use inspector::{Modifiers, PathInspector};

pub use tether_config::{Config, LogFormat, LogLevel};
pub use tether_protocol::{Command, Event, Outcome, Response};
