//! Classification of frames received by the test driver.

use serde_json::Value;

use crate::error::ProtocolError;
use crate::event::Event;
use crate::frame::decode_object;
use crate::response::Response;

/// Any message the host sends to the driver.
#[derive(Debug, Clone, PartialEq)]
pub enum PeerMessage {
    /// A reply correlated to an earlier command.
    Response(Response),
    /// An uncorrelated notification.
    Event(Event),
}

impl PeerMessage {
    /// Decodes a frame, telling responses (which carry `uuid`) from events.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::MalformedFrame`] when the frame matches
    /// neither shape.
    pub fn from_json(frame: &[u8]) -> Result<Self, ProtocolError> {
        let object = decode_object(frame)?;
        if object.contains_key("uuid") {
            return Response::from_object(object).map(Self::Response);
        }
        serde_json::from_value(Value::Object(object))
            .map(Self::Event)
            .map_err(ProtocolError::from_json_error)
    }
}
