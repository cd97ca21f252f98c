use serde::{Deserialize, Serialize};

/// Frames exchanged between a socket transport and the relay.
/// Payloads are opaque to the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "d", rename_all = "snake_case")]
pub enum RelayFrame {
    Subscribe { channel: String },
    Unsubscribe { channel: String },
    Publish { channel: String, payload: String },
    Deliver { channel: String, payload: String },
}
