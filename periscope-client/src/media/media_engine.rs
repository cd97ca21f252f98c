use crate::media::PeerObserver;
use anyhow::Result;
use async_trait::async_trait;
use periscope_core::{IceCandidate, Identity};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SdpKind {
    Offer,
    Answer,
}

/// Factory for per-peer connection handles. Injected into the peer registry,
/// so tests can substitute their own engine.
#[async_trait]
pub trait MediaEngine: Send + Sync {
    /// Allocate a connection for `peer`. Every asynchronous notification about
    /// that connection must be reported through `observer`.
    async fn create_peer(&self, peer: &Identity, observer: PeerObserver)
    -> Result<Arc<dyn PeerHandle>>;
}

/// Offer/answer and ICE primitives of one peer connection.
#[async_trait]
pub trait PeerHandle: Send + Sync {
    async fn create_offer(&self) -> Result<String>;

    async fn create_answer(&self) -> Result<String>;

    async fn set_local_description(&self, kind: SdpKind, sdp: String) -> Result<()>;

    async fn set_remote_description(&self, kind: SdpKind, sdp: String) -> Result<()>;

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()>;

    async fn close(&self) -> Result<()>;
}
