//! Conversion between transport payloads and [`SignalMessage`].
//!
//! Decoding is tolerant: several historical layouts are accepted and
//! normalized. Encoding always produces the canonical flat layout.

mod error;
mod strategies;
mod wire;

pub use error::DecodeError;

use crate::model::SignalMessage;
use serde_json::Value;
use strategies::STRATEGIES;
use tracing::trace;

pub fn decode(raw: &str) -> Result<SignalMessage, DecodeError> {
    let Value::Object(map) = serde_json::from_str::<Value>(raw)? else {
        return Err(DecodeError::NotAnObject);
    };

    for (name, strategy) in STRATEGIES {
        if let Some(message) = strategy(&map) {
            trace!(strategy = name, kind = %message.kind(), "Decoded signaling payload");
            return Ok(message);
        }
    }

    Err(DecodeError::UnknownShape {
        kind: map.get("type").and_then(Value::as_str).map(str::to_owned),
    })
}

/// Binary frames carry the same JSON as text frames.
pub fn decode_bytes(raw: &[u8]) -> Result<SignalMessage, DecodeError> {
    decode(std::str::from_utf8(raw)?)
}

pub fn encode(message: &SignalMessage) -> String {
    wire::to_wire_value(message).to_string()
}
