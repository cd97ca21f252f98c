use crate::model::{
    IceCandidate, IceMessage, Identity, MembershipMessage, SdpMessage, SignalMessage,
};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::{Value, json};

/// Canonical flat layout, as emitted by [`super::encode`].
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub(crate) enum WireMessage {
    #[serde(rename = "offer")]
    Offer(WireDescription),
    #[serde(rename = "answer")]
    Answer(WireDescription),
    #[serde(rename = "ice")]
    Ice(WireIce),
    #[serde(rename = "requestVideo")]
    RequestVideo(WireMembership),
    #[serde(rename = "leaveVideo")]
    LeaveVideo(WireMembership),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireDescription {
    client_id: String,
    #[serde(default)]
    to: Option<String>,
    sdp: String,
    #[serde(default)]
    video_source: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireIce {
    client_id: String,
    #[serde(default)]
    to: Option<String>,
    candidate: WireCandidate,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireCandidate {
    candidate: String,
    #[serde(rename = "sdpMLineIndex", default, deserialize_with = "lenient_index")]
    sdp_m_line_index: u16,
    #[serde(rename = "sdpMid", default, deserialize_with = "lenient_mid")]
    sdp_mid: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireMembership {
    client_id: String,
    #[serde(default)]
    video_source: String,
}

/// `sdpMid` arrives as a string, a number or null.
pub(crate) fn coerce_mid(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub(crate) fn coerce_index(value: &Value) -> Option<u16> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        Value::Null => Some(0),
        _ => None,
    }
}

fn lenient_mid<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<Value>::deserialize(d)?.as_ref().and_then(coerce_mid))
}

fn lenient_index<'de, D: Deserializer<'de>>(d: D) -> Result<u16, D::Error> {
    let value = Option::<Value>::deserialize(d)?.unwrap_or(Value::Null);
    coerce_index(&value)
        .ok_or_else(|| D::Error::custom(format!("invalid sdpMLineIndex: {value}")))
}

fn description(w: WireDescription) -> SdpMessage {
    SdpMessage {
        from: Identity(w.client_id),
        to: w.to.map(Identity),
        sdp: w.sdp,
        video_source: w.video_source,
    }
}

fn membership(w: WireMembership) -> MembershipMessage {
    MembershipMessage {
        from: Identity(w.client_id),
        video_source: w.video_source,
    }
}

impl From<WireMessage> for SignalMessage {
    fn from(wire: WireMessage) -> Self {
        match wire {
            WireMessage::Offer(w) => SignalMessage::Offer(description(w)),
            WireMessage::Answer(w) => SignalMessage::Answer(description(w)),
            WireMessage::Ice(w) => SignalMessage::IceCandidate(IceMessage {
                from: Identity(w.client_id),
                to: w.to.map(Identity),
                candidate: IceCandidate {
                    candidate: w.candidate.candidate,
                    sdp_m_line_index: w.candidate.sdp_m_line_index,
                    sdp_mid: w.candidate.sdp_mid,
                },
            }),
            WireMessage::RequestVideo(w) => SignalMessage::JoinRequest(membership(w)),
            WireMessage::LeaveVideo(w) => SignalMessage::LeaveRequest(membership(w)),
        }
    }
}

pub(crate) fn to_wire_value(message: &SignalMessage) -> Value {
    let kind = message.kind().wire_name();

    let mut value = match message {
        SignalMessage::Offer(m) | SignalMessage::Answer(m) => json!({
            "type": kind,
            "clientId": m.from.as_str(),
            "sdp": m.sdp,
            "videoSource": m.video_source,
        }),
        SignalMessage::IceCandidate(m) => json!({
            "type": kind,
            "clientId": m.from.as_str(),
            "candidate": {
                "candidate": m.candidate.candidate,
                "sdpMLineIndex": m.candidate.sdp_m_line_index,
                "sdpMid": m.candidate.sdp_mid,
            },
        }),
        SignalMessage::JoinRequest(m) | SignalMessage::LeaveRequest(m) => json!({
            "type": kind,
            "clientId": m.from.as_str(),
            "videoSource": m.video_source,
        }),
    };

    if let (Some(to), Value::Object(map)) = (message.recipient(), &mut value) {
        map.insert("to".to_owned(), Value::String(to.0.clone()));
    }

    value
}
