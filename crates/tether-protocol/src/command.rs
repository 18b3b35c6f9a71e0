//! Inbound command messages.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::ProtocolError;
use crate::frame::decode_object;

/// Command type that asks the host application to terminate.
pub const QUIT_COMMAND: &str = "quit";

const TYPE_FIELD: &str = "type";
const UUID_FIELD: &str = "uuid";

/// Request sent by the test driver.
///
/// On the wire a command is a flat JSON object: `type` names the intent,
/// `uuid` is the correlation token echoed by every response, and every other
/// top-level field forms the handler-specific payload.
///
/// ```json
/// {"type":"component-exists","uuid":"7c1f","path":"main-window/ok"}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Command {
    #[serde(rename = "type")]
    kind: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    uuid: String,
    #[serde(flatten)]
    payload: Map<String, Value>,
}

impl Command {
    /// Creates a command with an empty payload.
    pub fn new(kind: impl Into<String>, uuid: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            uuid: uuid.into(),
            payload: Map::new(),
        }
    }

    /// Returns a copy with an additional payload field.
    #[must_use]
    pub fn with_argument(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    /// Returns a copy with the correlation token replaced.
    #[must_use]
    pub fn with_uuid(mut self, uuid: impl Into<String>) -> Self {
        self.uuid = uuid.into();
        self
    }

    /// Parses a frame into a command without checking validity.
    ///
    /// Missing `type` and `uuid` fields decode as empty strings so that
    /// [`Command::validate`] can report them.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::MalformedFrame`] if the frame is not a JSON
    /// object and [`ProtocolError::InvalidCommand`] if `type` or `uuid` are
    /// not strings.
    pub fn from_json(frame: &[u8]) -> Result<Self, ProtocolError> {
        let mut payload = decode_object(frame)?;
        let kind = take_string(&mut payload, TYPE_FIELD)?;
        let uuid = take_string(&mut payload, UUID_FIELD)?;
        Ok(Self {
            kind,
            uuid,
            payload,
        })
    }

    /// Parses and validates a frame in one step.
    ///
    /// # Errors
    ///
    /// Returns any error produced by [`Command::from_json`] or
    /// [`Command::validate`].
    pub fn decode(frame: &[u8]) -> Result<Self, ProtocolError> {
        let command = Self::from_json(frame)?;
        command.validate()?;
        Ok(command)
    }

    /// Checks that the command can be dispatched.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidCommand`] when `type` is empty or
    /// whitespace.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        if self.kind.trim().is_empty() {
            return Err(ProtocolError::invalid_command("type field is empty"));
        }
        Ok(())
    }

    /// Returns `true` when [`Command::validate`] would succeed.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// The command type.
    #[must_use]
    pub fn kind(&self) -> &str {
        self.kind.trim()
    }

    /// The correlation token.
    #[must_use]
    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    /// All payload fields.
    #[must_use]
    pub fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }

    /// Returns `true` for the command asking the host to terminate.
    #[must_use]
    pub fn is_quit(&self) -> bool {
        self.kind() == QUIT_COMMAND
    }

    /// Deserializes a required payload field.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::MissingArgument`] when the field is absent and
    /// [`ProtocolError::InvalidArgument`] when it has the wrong shape.
    pub fn argument<T: DeserializeOwned>(&self, key: &str) -> Result<T, ProtocolError> {
        let value = self
            .payload
            .get(key)
            .ok_or_else(|| ProtocolError::missing_argument(key))?;
        T::deserialize(value).map_err(|error| ProtocolError::invalid_argument(key, error.to_string()))
    }

    /// Deserializes an optional payload field.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidArgument`] when the field is present
    /// but has the wrong shape.
    pub fn optional_argument<T: DeserializeOwned>(
        &self,
        key: &str,
    ) -> Result<Option<T>, ProtocolError> {
        match self.payload.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => T::deserialize(value)
                .map(Some)
                .map_err(|error| ProtocolError::invalid_argument(key, error.to_string())),
        }
    }

    /// Renders the command as compact JSON for logging.
    #[must_use]
    pub fn describe(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{} ({})", self.kind, self.uuid))
    }
}

fn take_string(object: &mut Map<String, Value>, key: &str) -> Result<String, ProtocolError> {
    match object.remove(key) {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(text)) => Ok(text),
        Some(_) => Err(ProtocolError::invalid_command(format!(
            "{key} field must be a string"
        ))),
    }
}
