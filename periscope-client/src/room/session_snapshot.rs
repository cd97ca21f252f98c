use crate::peer::PeerSummary;
use crate::room::RoomState;
use periscope_core::Identity;
use serde::Serialize;

/// Point-in-time copy of the session's state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub identity: Identity,
    pub room: RoomState,
    pub epoch: u64,
    pub connected_peers: Vec<Identity>,
    pub peers: Vec<PeerSummary>,
}

impl SessionSnapshot {
    pub fn peer(&self, id: &Identity) -> Option<&PeerSummary> {
        self.peers.iter().find(|p| &p.id == id)
    }
}
