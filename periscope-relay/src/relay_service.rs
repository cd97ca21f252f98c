use axum::extract::ws::Message;
use dashmap::DashMap;
use periscope_core::RelayFrame;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

pub type ConnectionId = u64;

struct RelayInner {
    connections: DashMap<ConnectionId, mpsc::UnboundedSender<Message>>,
    channels: DashMap<String, HashSet<ConnectionId>>,
    next_id: AtomicU64,
}

/// Channel fan-out shared by every relay connection.
#[derive(Clone)]
pub struct RelayService {
    inner: Arc<RelayInner>,
}

impl Default for RelayService {
    fn default() -> Self {
        Self::new()
    }
}

impl RelayService {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RelayInner {
                connections: DashMap::new(),
                channels: DashMap::new(),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    pub fn add_connection(&self, tx: mpsc::UnboundedSender<Message>) -> ConnectionId {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.connections.insert(id, tx);
        id
    }

    /// Drops the connection and every subscription it held.
    pub fn remove_connection(&self, id: ConnectionId) {
        self.inner.connections.remove(&id);
        self.inner.channels.retain(|_, subscribers| {
            subscribers.remove(&id);
            !subscribers.is_empty()
        });
    }

    pub fn subscribe(&self, id: ConnectionId, channel: &str) {
        self.inner
            .channels
            .entry(channel.to_owned())
            .or_default()
            .insert(id);
        debug!("Connection {} subscribed to {}", id, channel);
    }

    pub fn unsubscribe(&self, id: ConnectionId, channel: &str) {
        self.inner.channels.remove_if_mut(channel, |_, subscribers| {
            subscribers.remove(&id);
            subscribers.is_empty()
        });
        debug!("Connection {} unsubscribed from {}", id, channel);
    }

    /// Delivers `payload` to every subscriber of `channel`, the publisher included.
    /// Returns how many connections it was handed to.
    pub fn publish(&self, channel: &str, payload: String) -> usize {
        let subscribers: Vec<ConnectionId> = match self.inner.channels.get(channel) {
            Some(subscribers) => subscribers.iter().copied().collect(),
            None => {
                debug!("Publish to {} with no subscribers", channel);
                return 0;
            }
        };

        let frame = RelayFrame::Deliver {
            channel: channel.to_owned(),
            payload,
        };
        let json = match serde_json::to_string(&frame) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize relay frame: {}", e);
                return 0;
            }
        };

        let mut delivered = 0;
        for id in subscribers {
            let Some(tx) = self.inner.connections.get(&id) else {
                warn!("Subscriber {} on {} has no connection", id, channel);
                continue;
            };
            if let Err(e) = tx.send(Message::Text(json.clone().into())) {
                error!("Failed to queue frame for connection {}: {:?}", id, e);
                continue;
            }
            delivered += 1;
        }
        delivered
    }

    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.inner.channels.get(channel).map_or(0, |s| s.len())
    }

    pub fn connection_count(&self) -> usize {
        self.inner.connections.len()
    }
}
