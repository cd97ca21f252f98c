use crate::error::ErrorKind;
use periscope_core::{ConnectionState, Identity, TrackRef};

/// What the presentation layer is told.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    VideoTrackAdded {
        peer: Identity,
        track: TrackRef,
    },
    VideoTrackRemoved {
        peer: Identity,
    },
    ConnectionStateChanged {
        peer: Identity,
        state: ConnectionState,
    },
    ErrorOccurred {
        kind: ErrorKind,
        peer: Option<Identity>,
        message: String,
    },
}

impl Notification {
    pub fn peer(&self) -> Option<&Identity> {
        match self {
            Notification::VideoTrackAdded { peer, .. }
            | Notification::VideoTrackRemoved { peer }
            | Notification::ConnectionStateChanged { peer, .. } => Some(peer),
            Notification::ErrorOccurred { peer, .. } => peer.as_ref(),
        }
    }
}
