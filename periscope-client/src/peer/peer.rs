use crate::media::{HandleTag, PeerHandle};
use periscope_core::{ConnectionState, Identity, TrackRef};
use serde::Serialize;
use std::sync::Arc;

/// A remote identity the session holds a connection record for.
///
/// A peer without a handle is a placeholder: it was only ever seen through a
/// state update and owns no media-engine connection.
pub struct Peer {
    pub id: Identity,
    pub state: ConnectionState,
    pub track: Option<TrackRef>,
    pub(crate) handle: Option<Arc<dyn PeerHandle>>,
    pub(crate) tag: Option<HandleTag>,
    pub(crate) deadline: Option<u64>,
}

impl Peer {
    pub(crate) fn placeholder(id: Identity, state: ConnectionState) -> Self {
        Self {
            id,
            state,
            track: None,
            handle: None,
            tag: None,
            deadline: None,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.handle.is_none()
    }

    pub fn handle(&self) -> Option<&Arc<dyn PeerHandle>> {
        self.handle.as_ref()
    }

    pub fn summary(&self) -> PeerSummary {
        PeerSummary {
            id: self.id.clone(),
            state: self.state,
            track: self.track.clone(),
            placeholder: self.is_placeholder(),
        }
    }
}

/// Read-only view of a [`Peer`], safe to hand outside the session task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeerSummary {
    pub id: Identity,
    pub state: ConnectionState,
    pub track: Option<TrackRef>,
    pub placeholder: bool,
}

/// Mutation of the registry that the presentation layer hears about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryChange {
    StateChanged {
        peer: Identity,
        state: ConnectionState,
    },
    TrackAdded {
        peer: Identity,
        track: TrackRef,
    },
    TrackRemoved {
        peer: Identity,
    },
}

impl RegistryChange {
    pub fn peer(&self) -> &Identity {
        match self {
            RegistryChange::StateChanged { peer, .. }
            | RegistryChange::TrackAdded { peer, .. }
            | RegistryChange::TrackRemoved { peer } => peer,
        }
    }
}

/// Names one armed negotiation deadline. Stale once the peer is replaced,
/// re-armed, or connected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeadlineToken {
    pub peer: Identity,
    pub tag: HandleTag,
    pub seq: u64,
}
