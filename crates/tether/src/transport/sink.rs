//! Outbound seam between the control centre and the transport.

/// Destination for encoded outbound frames.
///
/// Sends are best-effort: implementations drop frames while no peer is
/// connected and never report write failures to the caller.
pub trait FrameSink {
    /// Returns `true` while a peer is attached.
    fn is_connected(&self) -> bool;

    /// Writes one complete, delimiter-terminated frame.
    fn send(&self, frame: &[u8]);

    /// Identifier of the attached peer, for sinks that tell peers apart.
    ///
    /// Inbound frames tagged with another peer are discarded while this
    /// returns `Some`.
    fn peer(&self) -> Option<u64> {
        None
    }
}
