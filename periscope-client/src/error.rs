use periscope_core::{DecodeError, Identity};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Media-engine step at which a negotiation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NegotiationStage {
    CreatePeer,
    CreateOffer,
    CreateAnswer,
    SetLocalDescription,
    SetRemoteDescription,
    AddIceCandidate,
}

impl fmt::Display for NegotiationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NegotiationStage::CreatePeer => "create-peer",
            NegotiationStage::CreateOffer => "create-offer",
            NegotiationStage::CreateAnswer => "create-answer",
            NegotiationStage::SetLocalDescription => "set-local-description",
            NegotiationStage::SetRemoteDescription => "set-remote-description",
            NegotiationStage::AddIceCandidate => "add-ice-candidate",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connect to {address} failed: {reason}")]
    Connect { address: String, reason: String },

    #[error("subscribe to {channel} failed: {reason}")]
    Subscribe { channel: String, reason: String },

    #[error("unsubscribe from {channel} failed: {reason}")]
    Unsubscribe { channel: String, reason: String },

    #[error("publish to {channel} failed: {reason}")]
    Publish { channel: String, reason: String },

    #[error("transport is not connected")]
    NotConnected,

    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("transport closed: {0}")]
    Closed(String),
}

/// Coarse classification carried by `errorOccurred` notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Decode,
    PeerNotFound,
    NegotiationFailed,
    NegotiationTimedOut,
    InvalidPrecondition,
    Transport,
    SessionClosed,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("undecodable signaling payload: {0}")]
    Decode(#[from] DecodeError),

    #[error("no peer registered for {0}")]
    PeerNotFound(Identity),

    #[error("negotiation with {peer} failed at {stage}: {reason}")]
    NegotiationFailed {
        peer: Identity,
        stage: NegotiationStage,
        reason: String,
    },

    #[error("negotiation with {0} did not complete in time")]
    NegotiationTimedOut(Identity),

    #[error("{operation} rejected: {reason}")]
    InvalidPrecondition {
        operation: &'static str,
        reason: String,
    },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("session task has stopped")]
    SessionClosed,
}

impl SessionError {
    pub(crate) fn negotiation(peer: &Identity, stage: NegotiationStage, err: anyhow::Error) -> Self {
        SessionError::NegotiationFailed {
            peer: peer.clone(),
            stage,
            reason: format!("{err:#}"),
        }
    }

    pub(crate) fn precondition(operation: &'static str, reason: impl Into<String>) -> Self {
        SessionError::InvalidPrecondition {
            operation,
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionError::Decode(_) => ErrorKind::Decode,
            SessionError::PeerNotFound(_) => ErrorKind::PeerNotFound,
            SessionError::NegotiationFailed { .. } => ErrorKind::NegotiationFailed,
            SessionError::NegotiationTimedOut(_) => ErrorKind::NegotiationTimedOut,
            SessionError::InvalidPrecondition { .. } => ErrorKind::InvalidPrecondition,
            SessionError::Transport(_) => ErrorKind::Transport,
            SessionError::SessionClosed => ErrorKind::SessionClosed,
        }
    }

    /// The peer the failure concerns, when there is one.
    pub fn peer(&self) -> Option<&Identity> {
        match self {
            SessionError::PeerNotFound(peer)
            | SessionError::NegotiationTimedOut(peer)
            | SessionError::NegotiationFailed { peer, .. } => Some(peer),
            _ => None,
        }
    }
}
