use periscope_client::core::{Identity, SignalMessage};
use periscope_client::{SessionHandle, SessionSnapshot};
use serde_json::json;
use std::time::Duration;

use super::mock_transport::MockTransport;

/// Timeout for waits on the session task (ms).
pub const WAIT_TIMEOUT_MS: u64 = 2000;

pub const LOCAL_ID: &str = "viewer-local";
pub const STREAM_CHANNEL: &str = "stream-signals";
pub const VIEWER_CHANNEL: &str = "viewer-signals";

/// Poll snapshots until `pred` holds. Returns the matching snapshot.
pub async fn wait_for_snapshot<F>(handle: &SessionHandle, pred: F) -> Option<SessionSnapshot>
where
    F: Fn(&SessionSnapshot) -> bool,
{
    let start = tokio::time::Instant::now();
    let timeout = Duration::from_millis(WAIT_TIMEOUT_MS);

    while start.elapsed() < timeout {
        let snapshot = handle.snapshot().await.ok()?;
        if pred(&snapshot) {
            return Some(snapshot);
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    None
}

/// Poll published messages until one matches `pred`.
pub async fn wait_for_published<F>(transport: &MockTransport, pred: F) -> Option<SignalMessage>
where
    F: Fn(&SignalMessage) -> bool,
{
    let start = tokio::time::Instant::now();
    let timeout = Duration::from_millis(WAIT_TIMEOUT_MS);

    loop {
        if let Some(msg) = transport.published().await.into_iter().find(|m| pred(m)) {
            return Some(msg);
        }
        if start.elapsed() >= timeout {
            return None;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Deliver a sentinel offer from `peer` and wait until it is answered.
/// Everything delivered before it has then been processed.
pub async fn flush_inbound(handle: &SessionHandle, transport: &MockTransport, peer: &str) {
    transport.deliver(STREAM_CHANNEL, offer_json(peer)).await;
    let peer = Identity::from(peer);
    let answered = wait_for_published(transport, |m| {
        matches!(m, SignalMessage::Answer(a) if a.to.as_ref() == Some(&peer))
    })
    .await;
    assert!(answered.is_some(), "sentinel offer was never answered");
    let _ = handle.snapshot().await;
}

pub fn offer_json(from: &str) -> String {
    json!({
        "type": "offer",
        "clientId": from,
        "sdp": format!("v=0\r\no=- remote-offer-{from}\r\n"),
        "videoSource": "",
    })
    .to_string()
}

pub fn answer_json(from: &str) -> String {
    json!({
        "type": "answer",
        "clientId": from,
        "sdp": format!("v=0\r\no=- remote-answer-{from}\r\n"),
        "videoSource": "",
    })
    .to_string()
}

pub fn ice_json(from: &str, candidate: &str) -> String {
    json!({
        "type": "ice",
        "clientId": from,
        "candidate": {
            "candidate": candidate,
            "sdpMLineIndex": 0,
            "sdpMid": "0",
        },
    })
    .to_string()
}
