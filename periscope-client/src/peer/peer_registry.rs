use crate::media::{HandleTag, MediaEngine, PeerEvent, PeerHandle, PeerObserver};
use crate::peer::{DeadlineToken, Peer, PeerSummary, RegistryChange};
use anyhow::Result;
use periscope_core::{ConnectionState, Identity, TrackRef};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Sole owner of every remote peer and its media-engine handle.
///
/// Only the session task touches the registry, so no locking is needed.
pub struct PeerRegistry {
    media: Arc<dyn MediaEngine>,
    events: mpsc::UnboundedSender<PeerEvent>,
    peers: HashMap<Identity, Peer>,
    epoch: u64,
    next_serial: u64,
    next_deadline: u64,
}

impl PeerRegistry {
    pub fn new(media: Arc<dyn MediaEngine>, events: mpsc::UnboundedSender<PeerEvent>) -> Self {
        Self {
            media,
            events,
            peers: HashMap::new(),
            epoch: 0,
            next_serial: 0,
            next_deadline: 0,
        }
    }

    /// Join cycle stamped onto handles created from now on.
    pub fn set_epoch(&mut self, epoch: u64) {
        self.epoch = epoch;
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Returns the peer's handle, allocating one if the peer is unknown or a
    /// placeholder. The flag is `true` when a handle was created.
    pub async fn get_or_create(&mut self, id: &Identity) -> Result<(Arc<dyn PeerHandle>, bool)> {
        if let Some(handle) = self.peers.get(id).and_then(|p| p.handle.clone()) {
            return Ok((handle, false));
        }

        self.next_serial += 1;
        let tag = HandleTag {
            epoch: self.epoch,
            serial: self.next_serial,
        };
        let observer = PeerObserver::new(id.clone(), tag, self.events.clone());
        let handle = self.media.create_peer(id, observer).await?;

        let peer = self
            .peers
            .entry(id.clone())
            .or_insert_with(|| Peer::placeholder(id.clone(), ConnectionState::New));
        peer.state = ConnectionState::New;
        peer.handle = Some(handle.clone());
        peer.tag = Some(tag);
        peer.deadline = None;

        info!("Created peer {} (epoch {}, serial {})", id, tag.epoch, tag.serial);
        Ok((handle, true))
    }

    /// Closes and forgets the peer. Unknown ids are a no-op.
    pub async fn remove(&mut self, id: &Identity) -> Vec<RegistryChange> {
        let Some(peer) = self.peers.remove(id) else {
            debug!("Remove for unknown peer {}", id);
            return Vec::new();
        };

        if let Some(handle) = &peer.handle {
            if let Err(e) = handle.close().await {
                warn!("Closing connection to {} failed: {:#}", id, e);
            }
        }
        info!("Removed peer {}", id);

        let mut changes = Vec::new();
        if peer.track.is_some() {
            changes.push(RegistryChange::TrackRemoved { peer: id.clone() });
        }
        if peer.state != ConnectionState::Closed {
            changes.push(RegistryChange::StateChanged {
                peer: id.clone(),
                state: ConnectionState::Closed,
            });
        }
        changes
    }

    /// Removes every peer still registered.
    pub async fn clear(&mut self) -> Vec<RegistryChange> {
        let mut changes = Vec::new();
        for id in self.ids() {
            changes.extend(self.remove(&id).await);
        }
        changes
    }

    /// Last write wins. An unknown id gets a placeholder record.
    pub fn update_state(&mut self, id: &Identity, state: ConnectionState) -> Option<RegistryChange> {
        match self.peers.get_mut(id) {
            Some(peer) if peer.state == state => return None,
            Some(peer) => peer.state = state,
            None => {
                debug!("State {} for unknown peer {}, inserting placeholder", state, id);
                self.peers
                    .insert(id.clone(), Peer::placeholder(id.clone(), state));
            }
        }
        Some(RegistryChange::StateChanged {
            peer: id.clone(),
            state,
        })
    }

    /// Only video tracks count. A second one for a peer that already has one is ignored.
    pub fn track_added(&mut self, id: &Identity, track: TrackRef) -> Option<RegistryChange> {
        if !track.is_video() {
            debug!("Ignoring {} track {} from {}", track.kind, track.id, id);
            return None;
        }
        let peer = self.peers.get_mut(id)?;
        if peer.track.is_some() {
            debug!("Duplicate track for {}, ignoring", id);
            return None;
        }
        peer.track = Some(track.clone());
        Some(RegistryChange::TrackAdded {
            peer: id.clone(),
            track,
        })
    }

    pub fn track_removed(&mut self, id: &Identity) -> Option<RegistryChange> {
        let peer = self.peers.get_mut(id)?;
        peer.track.take()?;
        Some(RegistryChange::TrackRemoved { peer: id.clone() })
    }

    /// The current state of a peer that owns a handle, as a change to announce.
    pub fn state_change(&self, id: &Identity) -> Option<RegistryChange> {
        let peer = self.peers.get(id).filter(|p| !p.is_placeholder())?;
        Some(RegistryChange::StateChanged {
            peer: id.clone(),
            state: peer.state,
        })
    }

    /// Whether `tag` names the live handle for `id`.
    pub fn owns(&self, id: &Identity, tag: HandleTag) -> bool {
        self.peers.get(id).and_then(|p| p.tag) == Some(tag)
    }

    /// Arms a fresh negotiation deadline, superseding any earlier one.
    pub fn arm_deadline(&mut self, id: &Identity) -> Option<DeadlineToken> {
        let peer = self.peers.get_mut(id)?;
        let tag = peer.tag?;
        self.next_deadline += 1;
        peer.deadline = Some(self.next_deadline);
        Some(DeadlineToken {
            peer: id.clone(),
            tag,
            seq: self.next_deadline,
        })
    }

    pub fn clear_deadline(&mut self, id: &Identity) {
        if let Some(peer) = self.peers.get_mut(id) {
            peer.deadline = None;
        }
    }

    /// A fired deadline counts only if it is the latest one for the same
    /// handle and the peer never reached `Connected`.
    pub fn deadline_is_current(&self, token: &DeadlineToken) -> bool {
        self.peers.get(&token.peer).is_some_and(|peer| {
            peer.tag == Some(token.tag)
                && peer.deadline == Some(token.seq)
                && peer.state != ConnectionState::Connected
        })
    }

    pub fn get(&self, id: &Identity) -> Option<&Peer> {
        self.peers.get(id)
    }

    pub fn contains(&self, id: &Identity) -> bool {
        self.peers.contains_key(id)
    }

    pub fn ids(&self) -> Vec<Identity> {
        self.peers.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Summaries sorted by id.
    pub fn summaries(&self) -> Vec<PeerSummary> {
        let mut summaries: Vec<_> = self.peers.values().map(Peer::summary).collect();
        summaries.sort_by(|a, b| a.id.cmp(&b.id));
        summaries
    }
}
