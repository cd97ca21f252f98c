mod relay_service;
mod ws_handler;

pub use relay_service::*;
pub use ws_handler::*;

use axum::Router;
use axum::routing::get;
use tokio::net::TcpListener;
use tracing::info;

/// `GET /ws` upgrades to a relay connection.
pub fn router(service: RelayService) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .with_state(service)
}

pub async fn serve(listener: TcpListener, service: RelayService) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!("Relay listening on ws://{}/ws", addr);
    }
    axum::serve(listener, router(service)).await
}
