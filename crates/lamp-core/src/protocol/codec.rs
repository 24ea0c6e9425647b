//! JSON codec for the TCP link to the ESP32 lamp.
//!
//! Wire format: UTF-8 JSON objects written back to back with no delimiter.
//!
//! ```text
//! {"device":"lamp-esp","event":"update","arg0":0,"arg1":1}{"device":...}
//! ```
//!
//! TCP is a byte stream, so one `read` may return half an object, exactly one
//! object, or several objects at once.  [`JsonStreamDecoder`] buffers what it
//! is given and yields every complete value it can find, keeping an
//! incomplete tail for the next call.
//!
//! # Error recovery
//!
//! A peer that sends garbage must not take the connection down.  The decoder
//! reports the problem as an `Err` item and discards the bad bytes, so the
//! caller can log it and keep reading.
//!
//! Objects that precede the garbage in the buffer are still returned.  Bytes
//! that follow it in the same buffer are discarded with it, including any
//! valid object among them:
//!
//! ```text
//! push(b"{\"a\":1}{not json}{\"b\":2}")  →  [Ok({"a":1}), Err(Malformed)]
//! push(b"{\"b\":2}")                       →  [Ok({"b":2})]
//! ```

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::domain::event::JsonObject;
use crate::protocol::messages::LampMessage;

/// Upper bound on buffered bytes that do not yet form a complete value.
///
/// Lamp messages are well under 100 bytes; a peer that keeps sending an
/// unterminated object past this limit is treated as malformed.
pub const MAX_PENDING_BYTES: usize = 64 * 1024;

/// Errors that can occur during message encoding or decoding.
#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    /// The bytes are not valid JSON (or not valid UTF-8).
    #[error("malformed JSON: {0}")]
    Malformed(String),

    /// The bytes are valid JSON but the top-level value is not an object.
    #[error("expected a JSON object, got {0}")]
    NotAnObject(&'static str),

    /// An incomplete value grew past [`MAX_PENDING_BYTES`].
    #[error("pending buffer overflow: {pending} bytes exceeds limit of {limit}")]
    Overflow { pending: usize, limit: usize },

    /// A message could not be serialized.
    #[error("encode failed: {0}")]
    Encode(String),
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Serializes a [`LampMessage`] into compact JSON bytes.
///
/// # Errors
///
/// Returns [`ProtocolError::Encode`] if serialization fails.
///
/// # Examples
///
/// ```rust
/// use lamp_core::{encode_message, LampMessage};
///
/// let bytes = encode_message(&LampMessage::req_update()).unwrap();
/// assert_eq!(
///     bytes,
///     br#"{"device":"lamp-esp","event":"req-update","arg0":0,"arg1":0}"#
/// );
/// ```
pub fn encode_message(msg: &LampMessage) -> Result<Vec<u8>, ProtocolError> {
    serde_json::to_vec(msg).map_err(|e| ProtocolError::Encode(e.to_string()))
}

/// Incremental splitter that turns a byte stream into JSON objects.
#[derive(Debug)]
pub struct JsonStreamDecoder {
    buffer: Vec<u8>,
    limit: usize,
}

impl Default for JsonStreamDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonStreamDecoder {
    pub fn new() -> Self {
        Self::with_limit(MAX_PENDING_BYTES)
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            buffer: Vec::new(),
            limit,
        }
    }

    /// Number of buffered bytes still waiting for the rest of a value.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Appends `bytes` and returns every complete value now available, in
    /// stream order.
    ///
    /// Each item is either a decoded object or the error describing why a
    /// value was dropped:
    ///
    /// - a complete non-object value yields [`ProtocolError::NotAnObject`] and
    ///   decoding continues after it;
    /// - invalid JSON yields [`ProtocolError::Malformed`] and the rest of the
    ///   buffer is discarded, including valid objects after the bad bytes;
    /// - an incomplete tail larger than the limit yields
    ///   [`ProtocolError::Overflow`] and is discarded.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<Result<JsonObject, ProtocolError>> {
        self.buffer.extend_from_slice(bytes);

        let mut items = Vec::new();
        let mut consumed = 0;
        {
            let mut stream =
                serde_json::Deserializer::from_slice(&self.buffer).into_iter::<Value>();
            loop {
                match stream.next() {
                    Some(Ok(Value::Object(obj))) => {
                        consumed = stream.byte_offset();
                        items.push(Ok(obj));
                    }
                    Some(Ok(other)) => {
                        consumed = stream.byte_offset();
                        items.push(Err(ProtocolError::NotAnObject(type_name(&other))));
                    }
                    // Incomplete value: keep the tail for the next call.
                    Some(Err(e)) if e.is_eof() => break,
                    Some(Err(e)) => {
                        consumed = self.buffer.len();
                        items.push(Err(ProtocolError::Malformed(e.to_string())));
                        break;
                    }
                    None => {
                        // Only whitespace remains.
                        consumed = self.buffer.len();
                        break;
                    }
                }
            }
        }
        self.buffer.drain(..consumed);

        if self.buffer.len() > self.limit {
            debug!(pending = self.buffer.len(), "discarding oversized partial value");
            items.push(Err(ProtocolError::Overflow {
                pending: self.buffer.len(),
                limit: self.limit,
            }));
            self.buffer.clear();
        }

        items
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(v: Value) -> JsonObject {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn test_push_single_complete_object() {
        let mut dec = JsonStreamDecoder::new();

        let items = dec.push(br#"{"device":"lamp-esp","event":"update","arg0":0,"arg1":2}"#);

        assert_eq!(items.len(), 1);
        assert_eq!(
            items[0],
            Ok(obj(json!({"device":"lamp-esp","event":"update","arg0":0,"arg1":2})))
        );
        assert_eq!(dec.pending(), 0);
    }

    #[test]
    fn test_push_two_concatenated_objects_yields_both_in_order() {
        let mut dec = JsonStreamDecoder::new();

        let items = dec.push(br#"{"a":1}{"b":2}"#);

        assert_eq!(items, vec![Ok(obj(json!({"a":1}))), Ok(obj(json!({"b":2})))]);
    }

    #[test]
    fn test_push_split_object_waits_for_rest() {
        // Arrange
        let mut dec = JsonStreamDecoder::new();

        // Act
        let first = dec.push(br#"{"device":"lamp-es"#);
        let second = dec.push(br#"p","event":"update"}"#);

        // Assert
        assert!(first.is_empty());
        assert_eq!(dec.pending(), 0);
        assert_eq!(
            second,
            vec![Ok(obj(json!({"device":"lamp-esp","event":"update"})))]
        );
    }

    #[test]
    fn test_push_non_object_value_reports_type_and_continues() {
        let mut dec = JsonStreamDecoder::new();

        let items = dec.push(br#"[1,2] {"ok":true}"#);

        assert_eq!(items[0], Err(ProtocolError::NotAnObject("array")));
        assert_eq!(items[1], Ok(obj(json!({"ok":true}))));
    }

    #[test]
    fn test_push_malformed_discards_buffer_and_recovers() {
        let mut dec = JsonStreamDecoder::new();

        let bad = dec.push(b"{not json}");
        let good = dec.push(br#"{"event":"update"}"#);

        assert!(matches!(bad.as_slice(), [Err(ProtocolError::Malformed(_))]));
        assert_eq!(dec.pending(), 0);
        assert_eq!(good, vec![Ok(obj(json!({"event":"update"})))]);
    }

    #[test]
    fn test_push_malformed_drops_objects_after_it_in_same_buffer() {
        // Arrange
        let mut dec = JsonStreamDecoder::new();
        let chunk = br#"{"arg1":1}{not json}{"device":"lamp-esp","event":"update","arg0":0,"arg1":2}"#;

        // Act
        let items = dec.push(chunk);
        let next = dec.push(br#"{"arg1":3}"#);

        // Assert: the object before the garbage survives, the one after it
        // does not, and the following push starts clean.
        assert_eq!(items.len(), 2);
        assert_eq!(items[0], Ok(obj(json!({"arg1": 1}))));
        assert!(matches!(items[1], Err(ProtocolError::Malformed(_))));
        assert_eq!(next, vec![Ok(obj(json!({"arg1": 3})))]);
        assert_eq!(dec.pending(), 0);
    }

    #[test]
    fn test_push_whitespace_only_consumes_everything() {
        let mut dec = JsonStreamDecoder::new();
        assert!(dec.push(b" \r\n ").is_empty());
        assert_eq!(dec.pending(), 0);
    }

    #[test]
    fn test_push_oversized_partial_value_overflows() {
        let mut dec = JsonStreamDecoder::with_limit(16);

        let items = dec.push(br#"{"device":"aaaaaaaaaaaaaaaaaaaa"#);

        assert!(matches!(
            items.as_slice(),
            [Err(ProtocolError::Overflow { limit: 16, .. })]
        ));
        assert_eq!(dec.pending(), 0);
    }
}
