use crate::relay_service::{ConnectionId, RelayService};
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use periscope_core::RelayFrame;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(service): State<RelayService>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, service))
}

async fn handle_socket(socket: WebSocket, service: RelayService) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let id = service.add_connection(tx);
    info!("New relay connection: {}", id);

    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(msg).await.is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn({
        let service = service.clone();

        async move {
            while let Some(Ok(msg)) = receiver.next().await {
                match msg {
                    Message::Text(text) => match serde_json::from_str::<RelayFrame>(&text) {
                        Ok(frame) => handle_frame(&service, id, frame),
                        Err(e) => warn!("Invalid relay frame from {}: {:?}", id, e),
                    },
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };

    service.remove_connection(id);
    info!("Relay connection closed: {}", id);
}

fn handle_frame(service: &RelayService, id: ConnectionId, frame: RelayFrame) {
    match frame {
        RelayFrame::Subscribe { channel } => service.subscribe(id, &channel),
        RelayFrame::Unsubscribe { channel } => service.unsubscribe(id, &channel),
        RelayFrame::Publish { channel, payload } => {
            let delivered = service.publish(&channel, payload);
            debug!("Connection {} published to {} ({} receivers)", id, channel, delivered);
        }
        RelayFrame::Deliver { channel, .. } => {
            warn!("Connection {} sent a deliver frame for {}, ignoring", id, channel);
        }
    }
}
