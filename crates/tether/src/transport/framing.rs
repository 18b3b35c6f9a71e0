//! Reassembly of newline-delimited frames from a byte stream.

use tracing::warn;

use tether_protocol::FRAME_DELIMITER;

use super::TRANSPORT_TARGET;

/// Maximum size of a single inbound frame in bytes.
pub(crate) const MAX_FRAME_BYTES: usize = 1024 * 1024;

/// Splits arbitrary reads into complete frames.
///
/// Partial frames are buffered across reads. A frame growing past the limit
/// is discarded up to its delimiter, after which decoding resumes with the
/// next frame. Blank lines are skipped.
#[derive(Debug)]
pub(crate) struct FrameDecoder {
    buffer: Vec<u8>,
    discarding: bool,
    max_frame_bytes: usize,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::with_limit(MAX_FRAME_BYTES)
    }
}

impl FrameDecoder {
    pub(crate) fn with_limit(max_frame_bytes: usize) -> Self {
        Self {
            buffer: Vec::new(),
            discarding: false,
            max_frame_bytes,
        }
    }

    /// Feeds bytes read from the stream, returning every frame they complete.
    pub(crate) fn push(&mut self, mut bytes: &[u8]) -> Vec<Vec<u8>> {
        let mut frames = Vec::new();
        while let Some(position) = bytes.iter().position(|byte| *byte == FRAME_DELIMITER) {
            let (line, rest) = bytes.split_at(position);
            bytes = rest.get(1..).unwrap_or_default();
            if let Some(frame) = self.complete(line) {
                frames.push(frame);
            }
        }
        self.buffer_partial(bytes);
        frames
    }

    /// Reports what is left when the stream ends. Partial frames are dropped.
    pub(crate) fn finish(&mut self) {
        if !self.discarding && !self.buffer.trim_ascii().is_empty() {
            warn!(
                target: TRANSPORT_TARGET,
                bytes = self.buffer.len(),
                "dropping partial frame at end of stream"
            );
        }
        self.buffer.clear();
        self.discarding = false;
    }

    fn complete(&mut self, line: &[u8]) -> Option<Vec<u8>> {
        if self.discarding {
            self.discarding = false;
            self.buffer.clear();
            return None;
        }
        self.buffer.extend_from_slice(line);
        let frame = std::mem::take(&mut self.buffer);
        if frame.len() > self.max_frame_bytes {
            warn!(
                target: TRANSPORT_TARGET,
                bytes = frame.len(),
                limit = self.max_frame_bytes,
                "dropping oversized frame"
            );
            return None;
        }
        if frame.trim_ascii().is_empty() {
            return None;
        }
        Some(frame)
    }

    fn buffer_partial(&mut self, bytes: &[u8]) {
        if self.discarding || bytes.is_empty() {
            return;
        }
        self.buffer.extend_from_slice(bytes);
        if self.buffer.len() > self.max_frame_bytes {
            warn!(
                target: TRANSPORT_TARGET,
                bytes = self.buffer.len(),
                limit = self.max_frame_bytes,
                "dropping oversized frame"
            );
            self.buffer.clear();
            self.discarding = true;
        }
    }
}
