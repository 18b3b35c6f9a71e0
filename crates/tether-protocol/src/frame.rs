//! JSON Lines framing helpers.
//!
//! Every message travels as one UTF-8 JSON object terminated by `\n`.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::ProtocolError;

/// Frame delimiter.
pub const FRAME_DELIMITER: u8 = b'\n';

/// Serializes a message into a newline-terminated frame.
///
/// # Errors
///
/// Returns [`ProtocolError::Serialize`] if the message cannot be encoded.
pub fn encode_frame<M: Serialize + ?Sized>(message: &M) -> Result<Vec<u8>, ProtocolError> {
    let mut frame = serde_json::to_vec(message).map_err(ProtocolError::Serialize)?;
    frame.push(FRAME_DELIMITER);
    Ok(frame)
}

/// Parses a frame into a JSON object, ignoring surrounding whitespace.
pub(crate) fn decode_object(frame: &[u8]) -> Result<Map<String, Value>, ProtocolError> {
    let trimmed = frame.trim_ascii();
    if trimmed.is_empty() {
        return Err(ProtocolError::malformed("empty frame"));
    }
    match serde_json::from_slice::<Value>(trimmed).map_err(ProtocolError::from_json_error)? {
        Value::Object(object) => Ok(object),
        other => Err(ProtocolError::malformed(format!(
            "expected a JSON object, found {}",
            value_kind(&other)
        ))),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[test]
    fn encoded_frames_end_with_delimiter() {
        let frame = encode_frame(&json!({"type": "ping"})).expect("encode");
        assert_eq!(frame.last(), Some(&FRAME_DELIMITER));
        assert!(!frame[..frame.len() - 1].contains(&FRAME_DELIMITER));
    }

    #[test]
    fn decodes_object_with_surrounding_whitespace() {
        let object = decode_object(b"  {\"type\":\"ping\"}\r\n").expect("decode");
        assert_eq!(object.get("type"), Some(&json!("ping")));
    }

    #[rstest]
    #[case::empty(b"")]
    #[case::blank(b"  \n")]
    #[case::not_json(b"not json")]
    #[case::array(b"[1,2]")]
    #[case::string(b"\"ping\"")]
    #[case::truncated(b"{\"type\":")]
    fn rejects_non_object_frames(#[case] frame: &[u8]) {
        assert!(matches!(
            decode_object(frame),
            Err(ProtocolError::MalformedFrame { .. })
        ));
    }
}
