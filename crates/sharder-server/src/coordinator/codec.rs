//! Wire Payload Codec
//!
//! Decodes inbound worker frames and encodes coordinator events. JSON is the
//! default; deployments can plug in their own [`PayloadCodec`].

use super::error::CodecError;
use serde::Serialize;
use serde_json::Value;

/// Encoder/decoder for gateway payloads.
pub trait PayloadCodec: Send + Sync + 'static {
    /// Decode an inbound frame into a JSON object.
    fn decode(&self, frame: &[u8]) -> Result<Value, CodecError>;

    /// Encode an outbound value as a text frame.
    fn encode(&self, value: &Value) -> Result<String, CodecError>;
}

/// Plain `serde_json` codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl PayloadCodec for JsonCodec {
    fn decode(&self, frame: &[u8]) -> Result<Value, CodecError> {
        let value: Value = serde_json::from_slice(frame)?;
        if !value.is_object() {
            return Err(CodecError::NotAnObject);
        }
        Ok(value)
    }

    fn encode(&self, value: &Value) -> Result<String, CodecError> {
        Ok(serde_json::to_string(value)?)
    }
}

/// Serialize an event through `codec`.
pub fn encode_event<T: Serialize>(codec: &dyn PayloadCodec, event: &T) -> Result<String, CodecError> {
    codec.encode(&serde_json::to_value(event)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sharder_core::Event;

    #[test]
    fn test_decode_object() {
        let value = JsonCodec.decode(br#"{"to": "*:*", "x": 1}"#).unwrap();
        assert_eq!(value, json!({"to": "*:*", "x": 1}));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(JsonCodec.decode(b"{nope"), Err(CodecError::Json(_))));
    }

    #[test]
    fn test_decode_rejects_non_object() {
        assert!(matches!(JsonCodec.decode(b"[1, 2]"), Err(CodecError::NotAnObject)));
    }

    #[test]
    fn test_encode_event() {
        let text = encode_event(&JsonCodec, &Event::invalid_id(4)).unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value, json!({"e": "INVALID ID", "d": {"id": 4, "new_id": null}}));
    }
}
