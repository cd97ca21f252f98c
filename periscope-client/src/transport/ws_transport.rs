use crate::error::TransportError;
use crate::transport::{Payload, TransportAdapter, TransportEvent, TransportState};
use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use periscope_core::RelayFrame;
use tokio::net::TcpStream;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, error, info, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct WsConnection {
    outbound: mpsc::UnboundedSender<Message>,
    send_task: JoinHandle<()>,
    recv_task: JoinHandle<()>,
}

/// [`TransportAdapter`] speaking the relay's frame protocol over a WebSocket.
pub struct WsTransport {
    connection: Mutex<Option<WsConnection>>,
}

impl Default for WsTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl WsTransport {
    pub fn new() -> Self {
        Self {
            connection: Mutex::new(None),
        }
    }

    /// `on_error` builds the operation-specific error from a failure reason.
    async fn send_frame<F>(&self, frame: RelayFrame, on_error: F) -> Result<(), TransportError>
    where
        F: FnOnce(String) -> TransportError,
    {
        let guard = self.connection.lock().await;
        let Some(connection) = guard.as_ref() else {
            return Err(TransportError::NotConnected);
        };
        let text = serde_json::to_string(&frame).map_err(|e| on_error(e.to_string()))?;
        connection
            .outbound
            .send(Message::Text(text))
            .map_err(|_| TransportError::Closed("sender task has stopped".to_owned()))
    }

    async fn sender_task(
        mut write: SplitSink<WsStream, Message>,
        mut rx: mpsc::UnboundedReceiver<Message>,
    ) {
        while let Some(msg) = rx.recv().await {
            if let Err(e) = write.send(msg).await {
                error!("Failed to send WebSocket message: {}", e);
                break;
            }
        }
        let _ = write.close().await;
        debug!("Sender task terminated");
    }

    async fn receiver_task(
        mut read: SplitStream<WsStream>,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) {
        while let Some(msg_result) = read.next().await {
            let frame = match msg_result {
                Ok(Message::Text(text)) => serde_json::from_str::<RelayFrame>(&text),
                Ok(Message::Binary(data)) => serde_json::from_slice::<RelayFrame>(&data),
                Ok(Message::Close(_)) => {
                    info!("Relay closed the connection");
                    break;
                }
                Ok(_) => continue,
                Err(e) => {
                    error!("WebSocket error: {}", e);
                    break;
                }
            };

            match frame {
                Ok(RelayFrame::Deliver { channel, payload }) => {
                    let event = TransportEvent::Message {
                        channel,
                        payload: Payload::Text(payload),
                    };
                    if events.send(event).is_err() {
                        break;
                    }
                }
                Ok(other) => warn!("Unexpected frame from relay: {:?}", other),
                Err(e) => warn!("Undecodable relay frame: {}", e),
            }
        }

        let _ = events.send(TransportEvent::StateChanged(TransportState::Disconnected));
        debug!("Receiver task terminated");
    }
}

#[async_trait]
impl TransportAdapter for WsTransport {
    async fn connect(
        &self,
        address: &str,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Result<(), TransportError> {
        info!("Connecting to relay: {}", address);

        let (ws_stream, _) = connect_async(address)
            .await
            .map_err(|e| TransportError::Connect {
                address: address.to_owned(),
                reason: e.to_string(),
            })?;

        let (write, read) = ws_stream.split();
        let (outbound, rx) = mpsc::unbounded_channel();

        let send_task = tokio::spawn(Self::sender_task(write, rx));
        let recv_task = tokio::spawn(Self::receiver_task(read, events));

        let previous = self.connection.lock().await.replace(WsConnection {
            outbound,
            send_task,
            recv_task,
        });
        if let Some(previous) = previous {
            previous.recv_task.abort();
            previous.send_task.abort();
        }

        info!("Connected to relay");
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> Result<(), TransportError> {
        self.send_frame(
            RelayFrame::Subscribe {
                channel: channel.to_owned(),
            },
            |reason| TransportError::Subscribe {
                channel: channel.to_owned(),
                reason,
            },
        )
        .await
    }

    async fn unsubscribe(&self, channel: &str) -> Result<(), TransportError> {
        self.send_frame(
            RelayFrame::Unsubscribe {
                channel: channel.to_owned(),
            },
            |reason| TransportError::Unsubscribe {
                channel: channel.to_owned(),
                reason,
            },
        )
        .await
    }

    async fn publish(&self, channel: &str, payload: String) -> Result<(), TransportError> {
        self.send_frame(
            RelayFrame::Publish {
                channel: channel.to_owned(),
                payload,
            },
            |reason| TransportError::Publish {
                channel: channel.to_owned(),
                reason,
            },
        )
        .await
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        let Some(connection) = self.connection.lock().await.take() else {
            return Ok(());
        };

        // Aborted before the socket drops, so an intentional close is not reported as a loss.
        connection.recv_task.abort();
        drop(connection.outbound);
        if connection.send_task.await.is_err() {
            debug!("Sender task ended abnormally");
        }
        info!("Disconnected from relay");
        Ok(())
    }
}
