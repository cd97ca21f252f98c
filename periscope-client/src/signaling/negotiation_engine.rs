use crate::error::{NegotiationStage, SessionError};
use crate::media::{PeerEvent, PeerEventKind, PeerHandle, SdpKind};
use crate::peer::{PeerRegistry, RegistryChange};
use periscope_core::{ConnectionState, IceMessage, Identity, SdpMessage, SignalMessage};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of a negotiation step that produced a description to publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Negotiated {
    pub peer: Identity,
    /// Whether the step allocated the peer's handle.
    pub created: bool,
    pub outbound: SignalMessage,
}

/// What a live media-engine event amounts to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeerEventOutcome {
    pub changes: Vec<RegistryChange>,
    pub outbound: Option<SignalMessage>,
}

/// Drives offer/answer/ICE for individual peers on top of the registry.
///
/// Never publishes anything itself; outbound messages are returned to the caller.
#[derive(Debug, Clone)]
pub struct NegotiationEngine {
    local: Identity,
}

impl NegotiationEngine {
    pub fn new(local: Identity) -> Self {
        Self { local }
    }

    /// Applies a remote offer and produces the answer addressed back to its sender.
    pub async fn handle_remote_offer(
        &self,
        registry: &mut PeerRegistry,
        offer: SdpMessage,
    ) -> Result<Negotiated, SessionError> {
        let peer = offer.from.clone();
        info!("Remote offer from {}", peer);

        let (handle, created) = registry
            .get_or_create(&peer)
            .await
            .map_err(|e| SessionError::negotiation(&peer, NegotiationStage::CreatePeer, e))?;

        handle
            .set_remote_description(SdpKind::Offer, offer.sdp)
            .await
            .map_err(|e| {
                SessionError::negotiation(&peer, NegotiationStage::SetRemoteDescription, e)
            })?;

        let sdp = handle
            .create_answer()
            .await
            .map_err(|e| SessionError::negotiation(&peer, NegotiationStage::CreateAnswer, e))?;

        handle
            .set_local_description(SdpKind::Answer, sdp.clone())
            .await
            .map_err(|e| {
                SessionError::negotiation(&peer, NegotiationStage::SetLocalDescription, e)
            })?;

        let outbound = SignalMessage::Answer(SdpMessage {
            from: self.local.clone(),
            to: Some(peer.clone()),
            sdp,
            video_source: offer.video_source,
        });
        Ok(Negotiated {
            peer,
            created,
            outbound,
        })
    }

    /// Applies the answer to an offer this session sent earlier.
    pub async fn handle_remote_answer(
        &self,
        registry: &mut PeerRegistry,
        answer: SdpMessage,
    ) -> Result<(), SessionError> {
        let peer = answer.from.clone();
        info!("Remote answer from {}", peer);

        let handle = existing_handle(registry, &peer)?;
        handle
            .set_remote_description(SdpKind::Answer, answer.sdp)
            .await
            .map_err(|e| SessionError::negotiation(&peer, NegotiationStage::SetRemoteDescription, e))
    }

    /// Candidates for peers without a live connection are rejected, not queued.
    pub async fn handle_remote_ice(
        &self,
        registry: &mut PeerRegistry,
        ice: IceMessage,
    ) -> Result<(), SessionError> {
        let peer = ice.from;
        debug!("Remote ICE candidate from {}", peer);

        let handle = existing_handle(registry, &peer)?;
        handle
            .add_ice_candidate(ice.candidate)
            .await
            .map_err(|e| SessionError::negotiation(&peer, NegotiationStage::AddIceCandidate, e))
    }

    /// Starts a negotiation from this side: the "watch" trigger.
    pub async fn create_offer_for(
        &self,
        registry: &mut PeerRegistry,
        peer: &Identity,
        video_source: &str,
    ) -> Result<Negotiated, SessionError> {
        info!("Creating offer for {}", peer);

        let (handle, created) = registry
            .get_or_create(peer)
            .await
            .map_err(|e| SessionError::negotiation(peer, NegotiationStage::CreatePeer, e))?;

        let sdp = handle
            .create_offer()
            .await
            .map_err(|e| SessionError::negotiation(peer, NegotiationStage::CreateOffer, e))?;

        handle
            .set_local_description(SdpKind::Offer, sdp.clone())
            .await
            .map_err(|e| {
                SessionError::negotiation(peer, NegotiationStage::SetLocalDescription, e)
            })?;

        let outbound = SignalMessage::Offer(SdpMessage {
            from: self.local.clone(),
            to: Some(peer.clone()),
            sdp,
            video_source: video_source.to_owned(),
        });
        Ok(Negotiated {
            peer: peer.clone(),
            created,
            outbound,
        })
    }

    /// Folds a media-engine event into the registry. Returns `None` for events
    /// from a handle that is no longer the peer's live one.
    pub fn handle_peer_event(
        &self,
        registry: &mut PeerRegistry,
        event: PeerEvent,
    ) -> Option<PeerEventOutcome> {
        let PeerEvent { peer, tag, kind } = event;
        if !registry.owns(&peer, tag) {
            debug!(
                "Discarding stale media event for {} (epoch {}, serial {})",
                peer, tag.epoch, tag.serial
            );
            return None;
        }

        let mut outcome = PeerEventOutcome::default();
        match kind {
            PeerEventKind::StateChanged(state) => {
                if state == ConnectionState::Connected {
                    registry.clear_deadline(&peer);
                }
                if state.is_terminal() {
                    warn!("Connection to {} is {}", peer, state);
                }
                outcome.changes.extend(registry.update_state(&peer, state));
            }
            PeerEventKind::TrackAdded(track) => {
                outcome.changes.extend(registry.track_added(&peer, track));
            }
            PeerEventKind::TrackRemoved => {
                outcome.changes.extend(registry.track_removed(&peer));
            }
            PeerEventKind::LocalCandidate(candidate) => {
                outcome.outbound = Some(SignalMessage::IceCandidate(IceMessage {
                    from: self.local.clone(),
                    to: Some(peer),
                    candidate,
                }));
            }
        }
        Some(outcome)
    }
}

fn existing_handle(
    registry: &PeerRegistry,
    peer: &Identity,
) -> Result<Arc<dyn PeerHandle>, SessionError> {
    registry
        .get(peer)
        .and_then(|p| p.handle().cloned())
        .ok_or_else(|| SessionError::PeerNotFound(peer.clone()))
}
