//! Wire message model for the tether control protocol.
//!
//! The protocol exchanges JSON Lines over a byte stream. Three message kinds
//! exist:
//!
//! - [`Command`]: sent by the test driver, carrying a `type`, a `uuid`
//!   correlation token and a free-form payload;
//! - [`Response`]: sent by the host, always stamped with the `uuid` of the
//!   command that triggered it;
//! - [`Event`]: sent by the host at any time, without correlation.
//!
//! [`PeerMessage`] lets the driver tell responses and events apart.

mod command;
mod error;
mod event;
mod frame;
mod peer;
mod response;

pub use command::{Command, QUIT_COMMAND};
pub use error::ProtocolError;
pub use event::Event;
pub use frame::{FRAME_DELIMITER, encode_frame};
pub use peer::PeerMessage;
pub use response::{Outcome, Response, UNHANDLED_MESSAGE};
