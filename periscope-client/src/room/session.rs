use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::events::{EventProjector, PresentationSink};
use crate::media::{MediaEngine, PeerEvent};
use crate::peer::{DeadlineToken, PeerRegistry};
use crate::room::{Reply, RoomSession, RoomState, SessionCommand, SessionHandle, SessionSnapshot};
use crate::signaling::{NegotiationEngine, Negotiated, Route, RoutedAction, Router};
use crate::transport::{Payload, TransportAdapter, TransportEvent, TransportState};
use periscope_core::{Identity, SignalMessage, decode, decode_bytes};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// The single task that owns the registry and the room session.
///
/// Commands, inbound transport traffic, media-engine events and negotiation
/// deadlines are all consumed here, one at a time.
pub struct Session {
    config: SessionConfig,
    room: RoomSession,
    registry: PeerRegistry,
    router: Router,
    negotiation: NegotiationEngine,
    projector: EventProjector,
    command_rx: mpsc::Receiver<SessionCommand>,
    transport_tx: mpsc::UnboundedSender<TransportEvent>,
    transport_rx: mpsc::UnboundedReceiver<TransportEvent>,
    peer_rx: mpsc::UnboundedReceiver<PeerEvent>,
    deadline_tx: mpsc::UnboundedSender<DeadlineToken>,
    deadline_rx: mpsc::UnboundedReceiver<DeadlineToken>,
}

impl Session {
    pub fn new(
        config: SessionConfig,
        transport: Arc<dyn TransportAdapter>,
        media: Arc<dyn MediaEngine>,
        presentation: Arc<dyn PresentationSink>,
        command_rx: mpsc::Receiver<SessionCommand>,
    ) -> Self {
        let (transport_tx, transport_rx) = mpsc::unbounded_channel();
        let (peer_tx, peer_rx) = mpsc::unbounded_channel();
        let (deadline_tx, deadline_rx) = mpsc::unbounded_channel();
        let identity = config.identity.clone();

        Self {
            room: RoomSession::new(&config, transport),
            registry: PeerRegistry::new(media, peer_tx),
            router: Router::new(identity.clone()),
            negotiation: NegotiationEngine::new(identity),
            projector: EventProjector::new(presentation),
            config,
            command_rx,
            transport_tx,
            transport_rx,
            peer_rx,
            deadline_tx,
            deadline_rx,
        }
    }

    /// Starts the session task and returns the handle that drives it.
    pub fn spawn(
        config: SessionConfig,
        transport: Arc<dyn TransportAdapter>,
        media: Arc<dyn MediaEngine>,
        presentation: Arc<dyn PresentationSink>,
    ) -> SessionHandle {
        let (tx, rx) = mpsc::channel(config.command_buffer.max(1));
        let identity = config.identity.clone();

        let session = Session::new(config, transport, media, presentation, rx);
        tokio::spawn(session.run());

        SessionHandle::new(tx, identity)
    }

    pub async fn run(mut self) {
        info!("Session {} started", self.room.identity());

        let shutdown_reply = loop {
            // Media events and deadlines drain before new input, so a command
            // always observes every event queued ahead of it.
            tokio::select! {
                biased;

                Some(evt) = self.peer_rx.recv() => self.handle_peer_event(evt).await,

                Some(token) = self.deadline_rx.recv() => self.handle_deadline(token).await,

                Some(evt) = self.transport_rx.recv() => self.handle_transport_event(evt).await,

                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(SessionCommand::Shutdown { reply }) => break Some(reply),
                        Some(c) => self.handle_command(c).await,
                        None => {
                            info!("Command channel closed. Shutting down session.");
                            break None;
                        }
                    }
                }
            }
        };

        if let Err(e) = self.room.disconnect(&mut self.registry, &self.projector).await {
            warn!("Disconnect during shutdown failed: {}", e);
        }
        if let Some(reply) = shutdown_reply {
            let _ = reply.send(());
        }

        info!("Session {} finished", self.room.identity());
    }

    async fn handle_command(&mut self, cmd: SessionCommand) {
        match cmd {
            SessionCommand::Connect { reply } => {
                let result = self.room.connect(self.transport_tx.clone()).await;
                self.reply(reply, result).await;
            }

            SessionCommand::Join { reply } => {
                let result = self.room.join(&mut self.registry).await;
                self.reply(reply, result).await;
            }

            SessionCommand::Leave { reply } => {
                let result = self.room.leave(&mut self.registry, &self.projector).await;
                self.reply(reply, result).await;
            }

            SessionCommand::Disconnect { reply } => {
                let result = self
                    .room
                    .disconnect(&mut self.registry, &self.projector)
                    .await;
                self.reply(reply, result).await;
            }

            SessionCommand::Watch { peer, reply } => {
                let result = self.watch(peer).await;
                self.reply(reply, result).await;
            }

            SessionCommand::RemovePeer { peer, reply } => {
                let known = self.registry.contains(&peer);
                self.remove_peer(&peer).await;
                let _ = reply.send(Ok(known));
            }

            SessionCommand::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }

            // Handled by the run loop.
            SessionCommand::Shutdown { reply } => {
                let _ = reply.send(());
            }
        }
    }

    async fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Message { channel, payload } => {
                if !self.room.accepts_inbound(&channel) {
                    debug!("Dropping message on {} while {}", channel, self.room.state());
                    return;
                }

                let decoded = match &payload {
                    Payload::Text(text) => decode(text),
                    Payload::Binary(bytes) => decode_bytes(bytes),
                };
                match decoded {
                    Ok(msg) => self.handle_signal(msg).await,
                    Err(e) => {
                        warn!("Dropping undecodable payload on {}: {}", channel, e);
                        self.projector.emit_error(&SessionError::from(e)).await;
                    }
                }
            }

            TransportEvent::StateChanged(TransportState::Disconnected) => {
                if let Some(err) = self
                    .room
                    .transport_lost(&mut self.registry, &self.projector)
                    .await
                {
                    self.projector.emit_error(&err).await;
                }
            }

            TransportEvent::StateChanged(state) => {
                debug!("Transport reports {:?}", state);
            }
        }
    }

    async fn handle_signal(&mut self, msg: SignalMessage) {
        let action = match self.router.route(msg) {
            Route::Action(action) => action,
            Route::Ignored(reason) => {
                debug!("Ignored inbound message: {:?}", reason);
                return;
            }
        };

        match action {
            RoutedAction::RemoteOffer(offer) => {
                let peer = offer.from.clone();
                let result = self
                    .negotiation
                    .handle_remote_offer(&mut self.registry, offer)
                    .await;
                if let Err(e) = self.finish_negotiation(&peer, result).await {
                    self.projector.emit_error(&e).await;
                }
            }

            RoutedAction::RemoteAnswer(answer) => {
                let peer = answer.from.clone();
                match self
                    .negotiation
                    .handle_remote_answer(&mut self.registry, answer)
                    .await
                {
                    Ok(()) => self.arm_deadline(&peer),
                    Err(e) => self.projector.emit_error(&e).await,
                }
            }

            RoutedAction::RemoteIceCandidate(ice) => {
                if let Err(e) = self
                    .negotiation
                    .handle_remote_ice(&mut self.registry, ice)
                    .await
                {
                    self.projector.emit_error(&e).await;
                }
            }
        }
    }

    async fn handle_peer_event(&mut self, event: PeerEvent) {
        let Some(outcome) = self
            .negotiation
            .handle_peer_event(&mut self.registry, event)
        else {
            return;
        };

        self.projector.emit_changes(outcome.changes).await;
        if let Some(msg) = outcome.outbound {
            if let Err(e) = self.room.publish(&msg).await {
                self.projector.emit_error(&e).await;
            }
        }
    }

    async fn handle_deadline(&mut self, token: DeadlineToken) {
        if !self.registry.deadline_is_current(&token) {
            return;
        }

        warn!("Negotiation with {} timed out", token.peer);
        self.remove_peer(&token.peer).await;
        self.projector
            .emit_error(&SessionError::NegotiationTimedOut(token.peer))
            .await;
    }

    async fn watch(&mut self, peer: Identity) -> Result<(), SessionError> {
        if self.room.state() != RoomState::Joined {
            return Err(SessionError::precondition(
                "watch",
                format!("session is {}", self.room.state()),
            ));
        }
        if peer.is_empty() || &peer == self.room.identity() {
            return Err(SessionError::precondition(
                "watch",
                format!("cannot watch {:?}", peer.as_str()),
            ));
        }

        let result = self
            .negotiation
            .create_offer_for(&mut self.registry, &peer, self.room.video_source())
            .await;
        self.finish_negotiation(&peer, result).await
    }

    /// Publishes the produced description and arms the negotiation deadline.
    async fn finish_negotiation(
        &mut self,
        peer: &Identity,
        result: Result<Negotiated, SessionError>,
    ) -> Result<(), SessionError> {
        // Tracked even on failure, so leave() still tears the connection down.
        // A connection tracked for the first time is announced in its `New` state.
        if self.registry.contains(peer) && self.room.track_peer(peer.clone()) {
            if let Some(change) = self.registry.state_change(peer) {
                self.projector.emit_change(change).await;
            }
        }

        let negotiated = result?;
        if negotiated.created {
            debug!("New peer {} in epoch {}", peer, self.registry.epoch());
        }
        self.room.publish(&negotiated.outbound).await?;
        self.arm_deadline(peer);
        Ok(())
    }

    fn arm_deadline(&mut self, peer: &Identity) {
        let Some(after) = self.config.negotiation_timeout else {
            return;
        };
        let Some(token) = self.registry.arm_deadline(peer) else {
            return;
        };

        let tx = self.deadline_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            let _ = tx.send(token);
        });
    }

    async fn remove_peer(&mut self, peer: &Identity) {
        let changes = self.registry.remove(peer).await;
        self.room.forget_peer(peer);
        self.projector.emit_changes(changes).await;
    }

    async fn reply(&self, reply: Reply, result: Result<(), SessionError>) {
        if let Err(e) = &result {
            self.projector.emit_error(e).await;
        }
        let _ = reply.send(result);
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            identity: self.room.identity().clone(),
            room: self.room.state(),
            epoch: self.room.epoch(),
            connected_peers: self.room.connected_peers(),
            peers: self.registry.summaries(),
        }
    }
}
