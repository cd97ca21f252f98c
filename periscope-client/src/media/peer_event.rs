use periscope_core::{ConnectionState, IceCandidate, Identity, TrackRef};
use tokio::sync::mpsc;
use tracing::debug;

/// Identifies one media-engine handle: the join cycle it was created in and
/// a serial unique within the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandleTag {
    pub epoch: u64,
    pub serial: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PeerEventKind {
    StateChanged(ConnectionState),
    TrackAdded(TrackRef),
    TrackRemoved,
    LocalCandidate(IceCandidate),
}

/// Media-engine notification, queued for the session task.
#[derive(Debug, Clone)]
pub struct PeerEvent {
    pub peer: Identity,
    pub tag: HandleTag,
    pub kind: PeerEventKind,
}

/// Handed to the media engine for each peer; turns callbacks into [`PeerEvent`]s.
#[derive(Debug, Clone)]
pub struct PeerObserver {
    peer: Identity,
    tag: HandleTag,
    tx: mpsc::UnboundedSender<PeerEvent>,
}

impl PeerObserver {
    pub fn new(peer: Identity, tag: HandleTag, tx: mpsc::UnboundedSender<PeerEvent>) -> Self {
        Self { peer, tag, tx }
    }

    pub fn peer(&self) -> &Identity {
        &self.peer
    }

    pub fn tag(&self) -> HandleTag {
        self.tag
    }

    pub fn state_changed(&self, state: ConnectionState) {
        self.emit(PeerEventKind::StateChanged(state));
    }

    pub fn track_added(&self, track: TrackRef) {
        self.emit(PeerEventKind::TrackAdded(track));
    }

    pub fn track_removed(&self) {
        self.emit(PeerEventKind::TrackRemoved);
    }

    pub fn local_candidate(&self, candidate: IceCandidate) {
        self.emit(PeerEventKind::LocalCandidate(candidate));
    }

    fn emit(&self, kind: PeerEventKind) {
        let event = PeerEvent {
            peer: self.peer.clone(),
            tag: self.tag,
            kind,
        };
        if self.tx.send(event).is_err() {
            debug!("Session gone, dropping media event for {}", self.peer);
        }
    }
}
