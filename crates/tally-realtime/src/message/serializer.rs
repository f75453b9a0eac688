//! JSON serialization for WebSocket messages.

use tally_core::result::AppResult;

use super::types::OutboundMessage;

/// Serialize an outbound message to a text frame payload.
pub fn serialize_outbound(msg: &OutboundMessage) -> AppResult<String> {
    Ok(serde_json::to_string(msg)?)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::message::types::CountsPayload;

    #[test]
    fn test_scalar_is_bare_integer() {
        let msg = OutboundMessage::Snapshot(CountsPayload::Scalar(42));
        assert_eq!(serialize_outbound(&msg).unwrap(), "42");
    }

    #[test]
    fn test_keys_are_plain_object() {
        let mut keys = BTreeMap::new();
        keys.insert("DE".to_string(), 2);
        keys.insert("DE.0".to_string(), 1);
        let msg = OutboundMessage::Update(CountsPayload::Keys(keys));
        assert_eq!(serialize_outbound(&msg).unwrap(), r#"{"DE":2,"DE.0":1}"#);
    }

    #[test]
    fn test_error_envelope() {
        let msg = OutboundMessage::error("INVALID_INPUT", "no classification");
        assert_eq!(
            serialize_outbound(&msg).unwrap(),
            r#"{"error":"INVALID_INPUT","message":"no classification"}"#
        );
    }
}
