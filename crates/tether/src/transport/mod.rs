//! TCP transport for the control endpoint.
//!
//! A [`Connection`] binds a listener and accepts peers on a background
//! thread. Each complete inbound frame is handed to the application thread
//! over a channel; outbound frames are written synchronously through the
//! [`FrameSink`] seam.

mod connection;
mod errors;
mod framing;
mod sink;

pub use self::connection::Connection;
pub use self::errors::TransportError;
pub use self::sink::FrameSink;

/// One raw inbound frame, without its delimiter.
///
/// Each frame carries the id of the peer that sent it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    peer: u64,
    bytes: Vec<u8>,
}

impl Frame {
    /// Wraps the bytes of a frame read from `peer`.
    #[must_use]
    pub const fn new(peer: u64, bytes: Vec<u8>) -> Self {
        Self { peer, bytes }
    }

    /// Identifier of the peer that sent the frame.
    #[must_use]
    pub const fn peer(&self) -> u64 {
        self.peer
    }

    /// Frame contents.
    #[must_use]
    pub const fn bytes(&self) -> &[u8] {
        self.bytes.as_slice()
    }
}

const TRANSPORT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");
