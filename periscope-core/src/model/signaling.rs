use crate::model::identity::Identity;
use std::fmt;

/// An SDP offer or answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdpMessage {
    pub from: Identity,
    pub to: Option<Identity>,
    pub sdp: String,
    pub video_source: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IceCandidate {
    pub candidate: String,
    pub sdp_m_line_index: u16,
    pub sdp_mid: Option<String>,
}

/// A trickled ICE candidate for the peer named by `from` (inbound) or `to` (outbound).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IceMessage {
    pub from: Identity,
    pub to: Option<Identity>,
    pub candidate: IceCandidate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipMessage {
    pub from: Identity,
    pub video_source: String,
}

/// Canonical signaling message, independent of the wire layout it arrived in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalMessage {
    Offer(SdpMessage),
    Answer(SdpMessage),
    IceCandidate(IceMessage),
    JoinRequest(MembershipMessage),
    LeaveRequest(MembershipMessage),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Offer,
    Answer,
    IceCandidate,
    JoinRequest,
    LeaveRequest,
}

impl MessageKind {
    /// Value of the `type` field on the wire.
    pub fn wire_name(&self) -> &'static str {
        match self {
            MessageKind::Offer => "offer",
            MessageKind::Answer => "answer",
            MessageKind::IceCandidate => "ice",
            MessageKind::JoinRequest => "requestVideo",
            MessageKind::LeaveRequest => "leaveVideo",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl SignalMessage {
    /// The originating identity.
    pub fn sender(&self) -> &Identity {
        match self {
            SignalMessage::Offer(m) | SignalMessage::Answer(m) => &m.from,
            SignalMessage::IceCandidate(m) => &m.from,
            SignalMessage::JoinRequest(m) | SignalMessage::LeaveRequest(m) => &m.from,
        }
    }

    /// The addressed recipient, if the message names one.
    pub fn recipient(&self) -> Option<&Identity> {
        match self {
            SignalMessage::Offer(m) | SignalMessage::Answer(m) => m.to.as_ref(),
            SignalMessage::IceCandidate(m) => m.to.as_ref(),
            SignalMessage::JoinRequest(_) | SignalMessage::LeaveRequest(_) => None,
        }
    }

    pub fn kind(&self) -> MessageKind {
        match self {
            SignalMessage::Offer(_) => MessageKind::Offer,
            SignalMessage::Answer(_) => MessageKind::Answer,
            SignalMessage::IceCandidate(_) => MessageKind::IceCandidate,
            SignalMessage::JoinRequest(_) => MessageKind::JoinRequest,
            SignalMessage::LeaveRequest(_) => MessageKind::LeaveRequest,
        }
    }
}
