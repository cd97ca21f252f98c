use crate::config::SessionConfig;
use crate::error::{SessionError, TransportError};
use crate::events::EventProjector;
use crate::peer::PeerRegistry;
use crate::transport::{TransportAdapter, TransportEvent};
use periscope_core::{Identity, MembershipMessage, SignalMessage, encode};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RoomState {
    Disconnected,
    Connecting,
    Connected,
    Joined,
    Leaving,
}

impl fmt::Display for RoomState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RoomState::Disconnected => "disconnected",
            RoomState::Connecting => "connecting",
            RoomState::Connected => "connected",
            RoomState::Joined => "joined",
            RoomState::Leaving => "leaving",
        };
        f.write_str(name)
    }
}

/// Membership state and the transport side effects of joining and leaving.
pub struct RoomSession {
    transport: Arc<dyn TransportAdapter>,
    identity: Identity,
    address: String,
    publish_channel: String,
    subscribe_channel: String,
    video_source: String,
    connect_timeout: Duration,
    state: RoomState,
    connected_peers: BTreeSet<Identity>,
    epoch: u64,
}

impl RoomSession {
    pub fn new(config: &SessionConfig, transport: Arc<dyn TransportAdapter>) -> Self {
        Self {
            transport,
            identity: config.identity.clone(),
            address: config.transport_address.clone(),
            publish_channel: config.publish_channel.clone(),
            subscribe_channel: config.subscribe_channel.clone(),
            video_source: config.video_source.clone(),
            connect_timeout: config.connect_timeout,
            state: RoomState::Disconnected,
            connected_peers: BTreeSet::new(),
            epoch: 0,
        }
    }

    pub fn state(&self) -> RoomState {
        self.state
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn video_source(&self) -> &str {
        &self.video_source
    }

    /// Join cycle counter, bumped on every successful join.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn connected_peers(&self) -> Vec<Identity> {
        self.connected_peers.iter().cloned().collect()
    }

    /// Returns `true` if the peer was not tracked yet.
    pub fn track_peer(&mut self, peer: Identity) -> bool {
        self.connected_peers.insert(peer)
    }

    pub fn forget_peer(&mut self, peer: &Identity) {
        self.connected_peers.remove(peer);
    }

    /// Inbound traffic is acted on only while joined, and only from the consumed channel.
    pub fn accepts_inbound(&self, channel: &str) -> bool {
        self.state == RoomState::Joined && channel == self.subscribe_channel
    }

    /// Falls back to `Disconnected` if the transport fails or does not answer in time.
    pub async fn connect(
        &mut self,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Result<(), SessionError> {
        if self.address.trim().is_empty() {
            return Err(SessionError::precondition("connect", "transport address is empty"));
        }
        if self.identity.is_empty() {
            return Err(SessionError::precondition("connect", "local identity is empty"));
        }
        if self.state != RoomState::Disconnected {
            return Err(SessionError::precondition(
                "connect",
                format!("session is {}", self.state),
            ));
        }

        self.state = RoomState::Connecting;
        info!("Connecting to {}", self.address);

        let result = match timeout(
            self.connect_timeout,
            self.transport.connect(&self.address, events),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout {
                operation: "connect",
                after: self.connect_timeout,
            }),
        };

        match result {
            Ok(()) => {
                self.state = RoomState::Connected;
                info!("Connected as {}", self.identity);
                Ok(())
            }
            Err(e) => {
                self.state = RoomState::Disconnected;
                Err(e.into())
            }
        }
    }

    pub async fn join(&mut self, registry: &mut PeerRegistry) -> Result<(), SessionError> {
        if self.state != RoomState::Connected {
            return Err(SessionError::precondition(
                "join",
                format!("session is {}", self.state),
            ));
        }

        self.transport.subscribe(&self.subscribe_channel).await?;

        let announce = SignalMessage::JoinRequest(self.membership());
        if let Err(e) = self
            .transport
            .publish(&self.publish_channel, encode(&announce))
            .await
        {
            if let Err(undo) = self.transport.unsubscribe(&self.subscribe_channel).await {
                warn!("Unsubscribe after failed join also failed: {}", undo);
            }
            return Err(e.into());
        }

        self.epoch += 1;
        registry.set_epoch(self.epoch);
        self.state = RoomState::Joined;
        info!("Joined {} (epoch {})", self.subscribe_channel, self.epoch);
        Ok(())
    }

    /// Always finishes local teardown; the first transport error is reported afterwards.
    pub async fn leave(
        &mut self,
        registry: &mut PeerRegistry,
        projector: &EventProjector,
    ) -> Result<(), SessionError> {
        if self.state != RoomState::Joined {
            return Err(SessionError::precondition(
                "leave",
                format!("session is {}", self.state),
            ));
        }

        self.state = RoomState::Leaving;
        info!("Leaving {}", self.subscribe_channel);

        let unsubscribed = self.transport.unsubscribe(&self.subscribe_channel).await;
        let announce = SignalMessage::LeaveRequest(self.membership());
        let announced = self
            .transport
            .publish(&self.publish_channel, encode(&announce))
            .await;

        self.teardown_peers(registry, projector).await;
        self.state = RoomState::Connected;

        unsubscribed?;
        announced?;
        Ok(())
    }

    /// Leaves first when joined, then closes the transport.
    pub async fn disconnect(
        &mut self,
        registry: &mut PeerRegistry,
        projector: &EventProjector,
    ) -> Result<(), SessionError> {
        if self.state == RoomState::Disconnected {
            return Ok(());
        }

        let left = if self.state == RoomState::Joined {
            self.leave(registry, projector).await
        } else {
            Ok(())
        };

        let closed = self.transport.disconnect().await;
        self.teardown_peers(registry, projector).await;
        self.state = RoomState::Disconnected;
        info!("Disconnected");

        left?;
        closed?;
        Ok(())
    }

    /// The transport dropped on its own. Returns the error to project, if the
    /// loss changed anything.
    pub async fn transport_lost(
        &mut self,
        registry: &mut PeerRegistry,
        projector: &EventProjector,
    ) -> Option<SessionError> {
        if self.state == RoomState::Disconnected {
            return None;
        }

        warn!("Transport lost while {}", self.state);
        if let Err(e) = self.transport.disconnect().await {
            warn!("Releasing the lost transport failed: {}", e);
        }
        self.teardown_peers(registry, projector).await;
        self.state = RoomState::Disconnected;
        Some(TransportError::Closed("connection lost".to_owned()).into())
    }

    /// Publishes negotiation traffic. Only a joined (or leaving) session talks to peers.
    pub async fn publish(&self, msg: &SignalMessage) -> Result<(), SessionError> {
        if !matches!(self.state, RoomState::Joined | RoomState::Leaving) {
            return Err(SessionError::precondition(
                "publish",
                format!("session is {}", self.state),
            ));
        }
        self.transport
            .publish(&self.publish_channel, encode(msg))
            .await?;
        Ok(())
    }

    fn membership(&self) -> MembershipMessage {
        MembershipMessage {
            from: self.identity.clone(),
            video_source: self.video_source.clone(),
        }
    }

    async fn teardown_peers(&mut self, registry: &mut PeerRegistry, projector: &EventProjector) {
        for peer in std::mem::take(&mut self.connected_peers) {
            projector.emit_changes(registry.remove(&peer).await).await;
        }
        projector.emit_changes(registry.clear().await).await;
    }
}
