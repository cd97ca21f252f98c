use super::wire::{WireMessage, coerce_index, coerce_mid};
use crate::model::{IceCandidate, IceMessage, Identity, SdpMessage, SignalMessage};
use serde_json::{Map, Value};

pub(crate) type DecodeStrategy = fn(&Map<String, Value>) -> Option<SignalMessage>;

/// Tried in order; the first strategy that yields a message wins.
pub(crate) const STRATEGIES: &[(&str, DecodeStrategy)] = &[
    ("canonical", canonical),
    ("nested-description", nested_description),
    ("flat-candidate", flat_candidate),
];

const ICE_TYPES: &[&str] = &["ice", "candidate", "iceCandidate"];

fn canonical(map: &Map<String, Value>) -> Option<SignalMessage> {
    serde_json::from_value::<WireMessage>(Value::Object(map.clone()))
        .ok()
        .map(SignalMessage::from)
}

/// `{"type": "offer", "clientId": .., "offer": {"sdp": .., "type": "offer"}}` and the
/// same for answers. The outer `type` may be missing when the nested key names the kind.
fn nested_description(map: &Map<String, Value>) -> Option<SignalMessage> {
    let key = match map.get("type").and_then(Value::as_str) {
        Some(t @ ("offer" | "answer")) => t,
        Some(_) => return None,
        None if map.contains_key("offer") => "offer",
        None if map.contains_key("answer") => "answer",
        None => return None,
    };

    let nested = map.get(key).or_else(|| map.get("sdp"))?.as_object()?;
    if let Some(inner_type) = nested.get("type").and_then(Value::as_str) {
        if inner_type != key {
            return None;
        }
    }

    let message = SdpMessage {
        from: identity(map)?,
        to: recipient(map),
        sdp: nested.get("sdp")?.as_str()?.to_owned(),
        video_source: video_source(map),
    };

    Some(match key {
        "offer" => SignalMessage::Offer(message),
        _ => SignalMessage::Answer(message),
    })
}

/// Candidate fields flattened onto the message, or the whole candidate JSON
/// serialized into the `candidate` string.
fn flat_candidate(map: &Map<String, Value>) -> Option<SignalMessage> {
    let kind = map.get("type").and_then(Value::as_str)?;
    if !ICE_TYPES.contains(&kind) {
        return None;
    }

    let candidate = match map.get("candidate")? {
        Value::String(s) if s.trim_start().starts_with('{') => {
            let inner: Map<String, Value> = serde_json::from_str(s).ok()?;
            candidate_from(&inner)?
        }
        Value::String(s) => IceCandidate {
            candidate: s.clone(),
            sdp_m_line_index: map.get("sdpMLineIndex").map_or(Some(0), coerce_index)?,
            sdp_mid: map.get("sdpMid").and_then(coerce_mid),
        },
        Value::Object(inner) => candidate_from(inner)?,
        _ => return None,
    };

    Some(SignalMessage::IceCandidate(IceMessage {
        from: identity(map)?,
        to: recipient(map),
        candidate,
    }))
}

fn candidate_from(obj: &Map<String, Value>) -> Option<IceCandidate> {
    Some(IceCandidate {
        candidate: obj.get("candidate")?.as_str()?.to_owned(),
        sdp_m_line_index: obj.get("sdpMLineIndex").map_or(Some(0), coerce_index)?,
        sdp_mid: obj.get("sdpMid").and_then(coerce_mid),
    })
}

fn identity(map: &Map<String, Value>) -> Option<Identity> {
    map.get("clientId")
        .and_then(Value::as_str)
        .map(Identity::from)
}

fn recipient(map: &Map<String, Value>) -> Option<Identity> {
    map.get("to").and_then(Value::as_str).map(Identity::from)
}

fn video_source(map: &Map<String, Value>) -> String {
    map.get("videoSource")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned()
}
