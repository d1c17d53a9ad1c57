use serde_json::Value;

use crate::message::ExtensionMessage;

/// Outcome of decoding an inbound JSON payload.
#[derive(Clone, Debug, PartialEq)]
pub enum Decoded {
    Message(ExtensionMessage),
    /// No `type` field, or one that names no known message.
    Unknown { kind: Option<String> },
    /// A known `type` whose fields did not fit.
    Malformed { kind: String, reason: String },
}

/// Decoder for inbound extension messages.
pub struct MessageCodec;

impl MessageCodec {
    pub fn decode(raw: &Value) -> Decoded {
        let kind = raw.get("type").and_then(Value::as_str);
        match kind {
            Some(k) if ExtensionMessage::TYPES.contains(&k) => {
                match serde_json::from_value::<ExtensionMessage>(raw.clone()) {
                    Ok(msg) => Decoded::Message(msg),
                    Err(e) => Decoded::Malformed {
                        kind: k.to_string(),
                        reason: e.to_string(),
                    },
                }
            }
            other => Decoded::Unknown {
                kind: other.map(str::to_string),
            },
        }
    }

    pub fn decode_str(raw: &str) -> Decoded {
        match serde_json::from_str::<Value>(raw) {
            Ok(v) => Self::decode(&v),
            Err(_) => Decoded::Unknown { kind: None },
        }
    }
}
