use crate::media::{MediaConfig, MediaEngine, PeerHandle, PeerObserver, SdpKind};
use anyhow::{Context, Result};
use async_trait::async_trait;
use periscope_core::{ConnectionState, IceCandidate, Identity, TrackRef};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine as RtcMediaEngine;
use webrtc::api::{API, APIBuilder};
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::rtp_transceiver::RTCRtpTransceiverInit;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::rtp_transceiver::rtp_transceiver_direction::RTCRtpTransceiverDirection;

/// [`MediaEngine`] backed by webrtc-rs. One `RTCPeerConnection` per remote peer.
pub struct WebRtcMediaEngine {
    api: API,
    config: MediaConfig,
}

impl WebRtcMediaEngine {
    pub fn new(config: MediaConfig) -> Result<Self> {
        let mut media = RtcMediaEngine::default();
        media
            .register_default_codecs()
            .context("Failed to register default codecs")?;
        let registry = register_default_interceptors(Registry::new(), &mut media)
            .context("Failed to register default interceptors")?;

        let api = APIBuilder::new()
            .with_media_engine(media)
            .with_interceptor_registry(registry)
            .build();

        Ok(Self { api, config })
    }

    fn rtc_configuration(&self) -> RTCConfiguration {
        let ice_servers = self
            .config
            .ice_servers
            .iter()
            .map(|server| RTCIceServer {
                urls: server.urls.clone(),
                username: server.username.clone().unwrap_or_default(),
                credential: server.credential.clone().unwrap_or_default(),
            })
            .collect();

        RTCConfiguration {
            ice_servers,
            ..Default::default()
        }
    }
}

fn map_state(state: RTCPeerConnectionState) -> Option<ConnectionState> {
    match state {
        RTCPeerConnectionState::New => Some(ConnectionState::New),
        RTCPeerConnectionState::Connecting => Some(ConnectionState::Connecting),
        RTCPeerConnectionState::Connected => Some(ConnectionState::Connected),
        RTCPeerConnectionState::Disconnected => Some(ConnectionState::Disconnected),
        RTCPeerConnectionState::Failed => Some(ConnectionState::Failed),
        RTCPeerConnectionState::Closed => Some(ConnectionState::Closed),
        RTCPeerConnectionState::Unspecified => None,
    }
}

#[async_trait]
impl MediaEngine for WebRtcMediaEngine {
    async fn create_peer(
        &self,
        peer: &Identity,
        observer: PeerObserver,
    ) -> Result<Arc<dyn PeerHandle>> {
        let pc = Arc::new(
            self.api
                .new_peer_connection(self.rtc_configuration())
                .await
                .with_context(|| format!("Failed to create peer connection for {peer}"))?,
        );

        // Set while a remote track is live, so a dying connection reports its removal once.
        let track_live = Arc::new(AtomicBool::new(false));

        let state_observer = observer.clone();
        let state_track = track_live.clone();
        pc.on_peer_connection_state_change(Box::new(move |s: RTCPeerConnectionState| {
            info!(
                "Peer connection state changed for {}: {:?}",
                state_observer.peer(),
                s
            );
            if let Some(state) = map_state(s) {
                state_observer.state_changed(state);
                if state.is_terminal() && state_track.swap(false, Ordering::AcqRel) {
                    state_observer.track_removed();
                }
            }
            Box::pin(async {})
        }));

        let ice_observer = observer.clone();
        pc.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let observer = ice_observer.clone();
            Box::pin(async move {
                let Some(candidate) = c else { return };
                let Ok(init) = candidate.to_json() else {
                    debug!("Dropping unserializable local candidate for {}", observer.peer());
                    return;
                };
                observer.local_candidate(IceCandidate {
                    candidate: init.candidate,
                    sdp_m_line_index: init.sdp_mline_index.unwrap_or(0),
                    sdp_mid: init.sdp_mid,
                });
            })
        }));

        let track_observer = observer;
        pc.on_track(Box::new(move |track, _receiver, _transceiver| {
            if track.kind() == RTPCodecType::Video {
                let track_ref = TrackRef {
                    id: track.id(),
                    stream_id: track.stream_id(),
                    kind: track.kind().to_string(),
                };
                debug!("Remote track {} from {}", track_ref.id, track_observer.peer());
                track_live.store(true, Ordering::Release);
                track_observer.track_added(track_ref);
            } else {
                debug!("Ignoring {} track from {}", track.kind(), track_observer.peer());
            }
            Box::pin(async {})
        }));

        Ok(Arc::new(WebRtcPeer { pc }))
    }
}

/// One webrtc-rs peer connection.
pub struct WebRtcPeer {
    pc: Arc<RTCPeerConnection>,
}

impl WebRtcPeer {
    fn description(kind: SdpKind, sdp: String) -> Result<RTCSessionDescription> {
        let desc = match kind {
            SdpKind::Offer => RTCSessionDescription::offer(sdp)?,
            SdpKind::Answer => RTCSessionDescription::answer(sdp)?,
        };
        Ok(desc)
    }
}

#[async_trait]
impl PeerHandle for WebRtcPeer {
    async fn create_offer(&self) -> Result<String> {
        // A viewer only receives, so a fresh connection gets one receive-only video m-line.
        if self.pc.get_transceivers().await.is_empty() {
            self.pc
                .add_transceiver_from_kind(
                    RTPCodecType::Video,
                    Some(RTCRtpTransceiverInit {
                        direction: RTCRtpTransceiverDirection::Recvonly,
                        send_encodings: vec![],
                    }),
                )
                .await
                .context("Failed to add video transceiver")?;
        }
        let offer = self.pc.create_offer(None).await?;
        Ok(offer.sdp)
    }

    async fn create_answer(&self) -> Result<String> {
        let answer = self.pc.create_answer(None).await?;
        Ok(answer.sdp)
    }

    async fn set_local_description(&self, kind: SdpKind, sdp: String) -> Result<()> {
        let desc = Self::description(kind, sdp)?;
        self.pc.set_local_description(desc).await?;
        Ok(())
    }

    async fn set_remote_description(&self, kind: SdpKind, sdp: String) -> Result<()> {
        let desc = Self::description(kind, sdp)?;
        self.pc.set_remote_description(desc).await?;
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()> {
        let init = RTCIceCandidateInit {
            candidate: candidate.candidate,
            sdp_mid: candidate.sdp_mid,
            sdp_mline_index: Some(candidate.sdp_m_line_index),
            username_fragment: None,
        };
        self.pc
            .add_ice_candidate(init)
            .await
            .context("Failed to add ICE candidate")?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.pc.close().await?;
        Ok(())
    }
}
