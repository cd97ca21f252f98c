use anyhow::{Result, bail};
use async_trait::async_trait;
use periscope_client::core::{ConnectionState, IceCandidate, Identity, TrackRef};
use periscope_client::{MediaEngine, NegotiationStage, PeerHandle, PeerObserver, SdpKind};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaCall {
    Create(Identity),
    CreateOffer(Identity),
    CreateAnswer(Identity),
    SetLocal(Identity, SdpKind),
    SetRemote(Identity, SdpKind),
    AddIce(Identity, String),
    Close(Identity),
}

#[derive(Default)]
struct Inner {
    calls: Mutex<Vec<MediaCall>>,
    observers: Mutex<HashMap<Identity, PeerObserver>>,
    fail_at: Mutex<Option<NegotiationStage>>,
}

/// Stand-in media engine. Reports `Connecting` once a remote description is
/// applied; everything else is driven by the test through [`FakeMediaEngine::observer`].
#[derive(Clone, Default)]
pub struct FakeMediaEngine {
    inner: Arc<Inner>,
}

impl FakeMediaEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later call at `stage` fail.
    pub fn fail_at(&self, stage: NegotiationStage) {
        *self.inner.fail_at.lock().unwrap() = Some(stage);
    }

    pub fn calls(&self) -> Vec<MediaCall> {
        self.inner.calls.lock().unwrap().clone()
    }

    pub fn created_count(&self, peer: &str) -> usize {
        let peer = Identity::from(peer);
        self.calls()
            .iter()
            .filter(|c| matches!(c, MediaCall::Create(id) if *id == peer))
            .count()
    }

    pub fn closed_count(&self, peer: &str) -> usize {
        let peer = Identity::from(peer);
        self.calls()
            .iter()
            .filter(|c| matches!(c, MediaCall::Close(id) if *id == peer))
            .count()
    }

    /// Observer of the most recent handle created for `peer`.
    pub fn observer(&self, peer: &str) -> PeerObserver {
        self.inner
            .observers
            .lock()
            .unwrap()
            .get(&Identity::from(peer))
            .cloned()
            .expect("no handle was created for this peer")
    }

    pub fn connect(&self, peer: &str) {
        self.observer(peer).state_changed(ConnectionState::Connected);
    }

    pub fn add_track(&self, peer: &str, track_id: &str) {
        self.observer(peer)
            .track_added(TrackRef::video(track_id, format!("{peer}-stream")));
    }

    fn check(&self, stage: NegotiationStage) -> Result<()> {
        if *self.inner.fail_at.lock().unwrap() == Some(stage) {
            bail!("injected failure at {stage}");
        }
        Ok(())
    }

    fn record(&self, call: MediaCall) {
        tracing::debug!("[FakeMedia] {:?}", call);
        self.inner.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl MediaEngine for FakeMediaEngine {
    async fn create_peer(&self, peer: &Identity, observer: PeerObserver) -> Result<Arc<dyn PeerHandle>> {
        self.check(NegotiationStage::CreatePeer)?;
        self.record(MediaCall::Create(peer.clone()));
        self.inner
            .observers
            .lock()
            .unwrap()
            .insert(peer.clone(), observer.clone());

        Ok(Arc::new(FakePeer {
            engine: self.clone(),
            peer: peer.clone(),
            observer,
        }))
    }
}

struct FakePeer {
    engine: FakeMediaEngine,
    peer: Identity,
    observer: PeerObserver,
}

#[async_trait]
impl PeerHandle for FakePeer {
    async fn create_offer(&self) -> Result<String> {
        self.engine.check(NegotiationStage::CreateOffer)?;
        self.engine.record(MediaCall::CreateOffer(self.peer.clone()));
        Ok(format!("v=0\r\no=- offer-for-{}\r\n", self.peer))
    }

    async fn create_answer(&self) -> Result<String> {
        self.engine.check(NegotiationStage::CreateAnswer)?;
        self.engine.record(MediaCall::CreateAnswer(self.peer.clone()));
        Ok(format!("v=0\r\no=- answer-for-{}\r\n", self.peer))
    }

    async fn set_local_description(&self, kind: SdpKind, _sdp: String) -> Result<()> {
        self.engine.check(NegotiationStage::SetLocalDescription)?;
        self.engine.record(MediaCall::SetLocal(self.peer.clone(), kind));
        Ok(())
    }

    async fn set_remote_description(&self, kind: SdpKind, _sdp: String) -> Result<()> {
        self.engine.check(NegotiationStage::SetRemoteDescription)?;
        self.engine.record(MediaCall::SetRemote(self.peer.clone(), kind));
        self.observer.state_changed(ConnectionState::Connecting);
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()> {
        self.engine.check(NegotiationStage::AddIceCandidate)?;
        self.engine
            .record(MediaCall::AddIce(self.peer.clone(), candidate.candidate));
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.engine.record(MediaCall::Close(self.peer.clone()));
        // Real engines report Closed after close(); the session must ignore it.
        self.observer.state_changed(ConnectionState::Closed);
        Ok(())
    }
}
