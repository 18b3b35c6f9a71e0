//! Outbound response messages.

use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ProtocolError;
use crate::frame::decode_object;

/// Failure message sent when no handler answers a command.
pub const UNHANDLED_MESSAGE: &str = "Unhandled message";

const UUID_FIELD: &str = "uuid";
const SUCCESS_FIELD: &str = "success";
const FAILURE_FIELD: &str = "failure";

/// Result carried by a [`Response`].
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The command succeeded; the payload is merged into the top level.
    Success(Map<String, Value>),
    /// The command failed with a human-readable message.
    Failure(String),
}

/// Reply to exactly one command.
///
/// Success responses encode as `{"uuid":U,"success":true,...payload}` and
/// failures as `{"uuid":U,"failure":message}`. Handlers build responses
/// without a uuid; the control centre stamps the originating command's uuid
/// with [`Response::with_uuid`] before transmission.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    uuid: Option<String>,
    outcome: Outcome,
}

impl Response {
    /// Creates an empty success response.
    #[must_use]
    pub fn ok() -> Self {
        Self::ok_with(Map::new())
    }

    /// Creates a success response carrying a payload.
    #[must_use]
    pub fn ok_with(payload: Map<String, Value>) -> Self {
        Self {
            uuid: None,
            outcome: Outcome::Success(payload),
        }
    }

    /// Creates a failure response.
    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            uuid: None,
            outcome: Outcome::Failure(message.into()),
        }
    }

    /// Creates the synthetic response sent when nothing handled a command.
    #[must_use]
    pub fn unhandled() -> Self {
        Self::fail(UNHANDLED_MESSAGE)
    }

    /// Returns a copy with an extra payload field.
    ///
    /// Fields added to a failure response are ignored.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        if let Outcome::Success(payload) = &mut self.outcome {
            payload.insert(key.into(), value.into());
        }
        self
    }

    /// Returns a copy correlated to the given command uuid.
    #[must_use]
    pub fn with_uuid(self, uuid: impl Into<String>) -> Self {
        Self {
            uuid: Some(uuid.into()),
            ..self
        }
    }

    /// Correlation token, if stamped.
    #[must_use]
    pub fn uuid(&self) -> Option<&str> {
        self.uuid.as_deref()
    }

    /// Result carried by the response.
    #[must_use]
    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    /// Returns `true` for success responses.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Success(_))
    }

    /// Failure message, if the response is a failure.
    #[must_use]
    pub fn failure_message(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Failure(message) => Some(message),
            Outcome::Success(_) => None,
        }
    }

    /// Looks up a success payload field.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&Value> {
        match &self.outcome {
            Outcome::Success(payload) => payload.get(key),
            Outcome::Failure(_) => None,
        }
    }

    /// Decodes a response frame.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::MalformedFrame`] if the frame is not a JSON
    /// object of either response shape.
    pub fn from_json(frame: &[u8]) -> Result<Self, ProtocolError> {
        Self::from_object(decode_object(frame)?)
    }

    pub(crate) fn from_object(mut object: Map<String, Value>) -> Result<Self, ProtocolError> {
        let uuid = match object.remove(UUID_FIELD) {
            None | Some(Value::Null) => None,
            Some(Value::String(uuid)) => Some(uuid),
            Some(_) => return Err(ProtocolError::malformed("uuid field must be a string")),
        };
        if let Some(failure) = object.remove(FAILURE_FIELD) {
            let message = match failure {
                Value::String(message) => message,
                other => other.to_string(),
            };
            return Ok(Self {
                uuid,
                outcome: Outcome::Failure(message),
            });
        }
        match object.remove(SUCCESS_FIELD) {
            Some(Value::Bool(true)) => Ok(Self {
                uuid,
                outcome: Outcome::Success(object),
            }),
            Some(Value::Bool(false)) => Ok(Self {
                uuid,
                outcome: Outcome::Failure(String::new()),
            }),
            _ => Err(ProtocolError::malformed(
                "response carries neither success nor failure",
            )),
        }
    }

    /// Renders the response as compact JSON for logging.
    #[must_use]
    pub fn describe(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{:?}", self.outcome))
    }
}

impl Serialize for Response {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        if let Some(uuid) = &self.uuid {
            map.serialize_entry(UUID_FIELD, uuid)?;
        }
        match &self.outcome {
            Outcome::Success(payload) => {
                map.serialize_entry(SUCCESS_FIELD, &true)?;
                for (key, value) in payload {
                    if key != UUID_FIELD && key != SUCCESS_FIELD {
                        map.serialize_entry(key, value)?;
                    }
                }
            }
            Outcome::Failure(message) => map.serialize_entry(FAILURE_FIELD, message)?,
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Response {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let object = Map::<String, Value>::deserialize(deserializer)?;
        Self::from_object(object).map_err(de::Error::custom)
    }
}
