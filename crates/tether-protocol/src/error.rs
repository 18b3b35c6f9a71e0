//! Error types for message decoding and payload access.

use thiserror::Error;

/// Errors surfaced while decoding frames or reading command payloads.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Frame could not be parsed as a JSON object of the expected shape.
    #[error("malformed frame: {message}")]
    MalformedFrame {
        /// Parser diagnostic.
        message: String,
        /// Underlying JSON error, when the parser produced one.
        #[source]
        source: Option<serde_json::Error>,
    },

    /// Frame parsed but does not describe a valid command.
    #[error("invalid command: {message}")]
    InvalidCommand {
        /// Description of the violated constraint.
        message: String,
    },

    /// A payload field required by a handler is absent.
    #[error("missing argument '{key}'")]
    MissingArgument {
        /// Name of the payload field.
        key: String,
    },

    /// A payload field is present but has the wrong shape.
    #[error("invalid argument '{key}': {message}")]
    InvalidArgument {
        /// Name of the payload field.
        key: String,
        /// Deserializer diagnostic.
        message: String,
    },

    /// Outbound message serialization failed.
    #[error("failed to serialize message: {0}")]
    Serialize(#[source] serde_json::Error),
}

impl ProtocolError {
    /// Creates a malformed frame error from a serde error.
    #[must_use]
    pub fn from_json_error(source: serde_json::Error) -> Self {
        Self::MalformedFrame {
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Creates a malformed frame error with a custom message.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedFrame {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an invalid command error.
    pub fn invalid_command(message: impl Into<String>) -> Self {
        Self::InvalidCommand {
            message: message.into(),
        }
    }

    /// Creates a missing argument error.
    pub fn missing_argument(key: impl Into<String>) -> Self {
        Self::MissingArgument { key: key.into() }
    }

    /// Creates an invalid argument error.
    pub fn invalid_argument(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            key: key.into(),
            message: message.into(),
        }
    }
}
