use async_trait::async_trait;
use bytes::Bytes;
use periscope_client::core::{SignalMessage, decode};
use periscope_client::{Payload, TransportAdapter, TransportError, TransportEvent, TransportState};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, mpsc};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    Connect(String),
    Subscribe(String),
    Unsubscribe(String),
    Publish { channel: String, payload: String },
    Disconnect,
}

#[derive(Default)]
struct Inner {
    calls: Mutex<Vec<TransportCall>>,
    events: Mutex<Option<mpsc::UnboundedSender<TransportEvent>>>,
    fail_connect: AtomicBool,
    hang_connect: AtomicBool,
    fail_publish: AtomicBool,
    fail_unsubscribe: AtomicBool,
}

/// Mock TransportAdapter that records every call and lets tests inject inbound traffic.
#[derive(Clone, Default)]
pub struct MockTransport {
    inner: Arc<Inner>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_connect(&self) {
        self.inner.fail_connect.store(true, Ordering::SeqCst);
    }

    /// `connect` never completes.
    pub fn hang_connect(&self) {
        self.inner.hang_connect.store(true, Ordering::SeqCst);
    }

    pub fn fail_publish(&self, fail: bool) {
        self.inner.fail_publish.store(fail, Ordering::SeqCst);
    }

    pub fn fail_unsubscribe(&self) {
        self.inner.fail_unsubscribe.store(true, Ordering::SeqCst);
    }

    pub async fn calls(&self) -> Vec<TransportCall> {
        self.inner.calls.lock().await.clone()
    }

    pub async fn clear_calls(&self) {
        self.inner.calls.lock().await.clear();
    }

    /// Decoded payloads of every successful publish, in order.
    pub async fn published(&self) -> Vec<SignalMessage> {
        self.inner
            .calls
            .lock()
            .await
            .iter()
            .filter_map(|call| match call {
                TransportCall::Publish { payload, .. } => decode(payload).ok(),
                _ => None,
            })
            .collect()
    }

    pub async fn published_raw(&self) -> Vec<String> {
        self.inner
            .calls
            .lock()
            .await
            .iter()
            .filter_map(|call| match call {
                TransportCall::Publish { payload, .. } => Some(payload.clone()),
                _ => None,
            })
            .collect()
    }

    /// Deliver a text payload as if it arrived on `channel`.
    pub async fn deliver(&self, channel: &str, payload: impl Into<String>) {
        self.send_event(TransportEvent::Message {
            channel: channel.to_owned(),
            payload: Payload::Text(payload.into()),
        })
        .await;
    }

    pub async fn deliver_binary(&self, channel: &str, payload: &[u8]) {
        self.send_event(TransportEvent::Message {
            channel: channel.to_owned(),
            payload: Payload::Binary(Bytes::copy_from_slice(payload)),
        })
        .await;
    }

    /// Simulate the connection dropping on its own.
    pub async fn drop_connection(&self) {
        self.send_event(TransportEvent::StateChanged(TransportState::Disconnected))
            .await;
    }

    async fn send_event(&self, event: TransportEvent) {
        let events = self.inner.events.lock().await;
        let tx = events.as_ref().expect("transport was never connected");
        tx.send(event).expect("session dropped its transport receiver");
    }

    async fn record(&self, call: TransportCall) {
        tracing::debug!("[MockTransport] {:?}", call);
        self.inner.calls.lock().await.push(call);
    }
}

#[async_trait]
impl TransportAdapter for MockTransport {
    async fn connect(
        &self,
        address: &str,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Result<(), TransportError> {
        self.record(TransportCall::Connect(address.to_owned())).await;

        if self.inner.hang_connect.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.inner.fail_connect.load(Ordering::SeqCst) {
            return Err(TransportError::Connect {
                address: address.to_owned(),
                reason: "refused".to_owned(),
            });
        }

        *self.inner.events.lock().await = Some(events);
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> Result<(), TransportError> {
        self.record(TransportCall::Subscribe(channel.to_owned())).await;
        Ok(())
    }

    async fn unsubscribe(&self, channel: &str) -> Result<(), TransportError> {
        if self.inner.fail_unsubscribe.load(Ordering::SeqCst) {
            return Err(TransportError::Unsubscribe {
                channel: channel.to_owned(),
                reason: "broken pipe".to_owned(),
            });
        }
        self.record(TransportCall::Unsubscribe(channel.to_owned())).await;
        Ok(())
    }

    async fn publish(&self, channel: &str, payload: String) -> Result<(), TransportError> {
        if self.inner.fail_publish.load(Ordering::SeqCst) {
            return Err(TransportError::Publish {
                channel: channel.to_owned(),
                reason: "broken pipe".to_owned(),
            });
        }
        self.record(TransportCall::Publish {
            channel: channel.to_owned(),
            payload,
        })
        .await;
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        self.record(TransportCall::Disconnect).await;
        Ok(())
    }
}
