use crate::error::TransportError;
use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

/// Coarse connectivity reported by a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Disconnected,
    Connecting,
    Connected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Text(String),
    Binary(Bytes),
}

/// Inbound traffic from the transport, consumed by the session task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Message { channel: String, payload: Payload },
    StateChanged(TransportState),
}

/// Publish/subscribe message channel used purely for signaling.
///
/// `connect` hands over the sender all inbound messages and connectivity
/// changes are reported on, until the next `connect`.
#[async_trait]
pub trait TransportAdapter: Send + Sync {
    async fn connect(
        &self,
        address: &str,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Result<(), TransportError>;

    async fn subscribe(&self, channel: &str) -> Result<(), TransportError>;

    async fn unsubscribe(&self, channel: &str) -> Result<(), TransportError>;

    async fn publish(&self, channel: &str, payload: String) -> Result<(), TransportError>;

    async fn disconnect(&self) -> Result<(), TransportError>;
}
