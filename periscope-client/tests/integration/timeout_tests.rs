use periscope_client::core::{ConnectionState, Identity};
use periscope_client::{ErrorKind, Notification, RoomState};
use std::time::Duration;

use crate::integration::{TestSession, create_test_session, create_test_session_with, init_tracing, test_config};
use crate::utils::{STREAM_CHANNEL, answer_json, offer_json};

const NEGOTIATION_TIMEOUT: Duration = Duration::from_secs(5);

async fn joined_with_timeout() -> TestSession {
    let session = create_test_session_with(
        test_config().with_negotiation_timeout(Some(NEGOTIATION_TIMEOUT)),
    );
    session.handle.connect().await.unwrap();
    session.handle.join().await.unwrap();
    session
}

#[tokio::test(start_paused = true)]
async fn test_hanging_connect_falls_back_to_disconnected() {
    init_tracing();

    let session = create_test_session();
    session.transport.hang_connect();

    let err = session.handle.connect().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Transport);
    assert!(err.to_string().contains("timed out"));
    assert_eq!(
        session.handle.snapshot().await.unwrap().room,
        RoomState::Disconnected
    );
}

#[tokio::test(start_paused = true)]
async fn test_stalled_negotiation_is_removed() {
    init_tracing();

    let session = joined_with_timeout().await;
    let bob = Identity::from("bob");
    session.transport.deliver(STREAM_CHANNEL, offer_json("bob")).await;
    assert!(session.handle.snapshot().await.unwrap().peer(&bob).is_some());

    tokio::time::sleep(NEGOTIATION_TIMEOUT + Duration::from_secs(1)).await;

    let snapshot = session.handle.snapshot().await.unwrap();
    assert!(snapshot.peer(&bob).is_none());
    assert!(snapshot.connected_peers.is_empty());
    assert_eq!(session.media.closed_count("bob"), 1);
    assert!(
        session
            .presentation
            .errors()
            .await
            .contains(&(ErrorKind::NegotiationTimedOut, Some(bob)))
    );
}

#[tokio::test(start_paused = true)]
async fn test_connected_peer_outlives_its_deadline() {
    init_tracing();

    let session = joined_with_timeout().await;
    let bob = Identity::from("bob");
    session.transport.deliver(STREAM_CHANNEL, offer_json("bob")).await;
    let _ = session.handle.snapshot().await;
    session.media.connect("bob");

    tokio::time::sleep(NEGOTIATION_TIMEOUT * 2).await;

    let snapshot = session.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.peer(&bob).unwrap().state, ConnectionState::Connected);
    assert!(!session.presentation.has_error(ErrorKind::NegotiationTimedOut).await);
}

#[tokio::test(start_paused = true)]
async fn test_answer_rearms_the_deadline() {
    init_tracing();

    let session = joined_with_timeout().await;
    let alice = Identity::from("alice");
    session.handle.watch("alice").await.unwrap();

    tokio::time::sleep(Duration::from_secs(3)).await;
    session.transport.deliver(STREAM_CHANNEL, answer_json("alice")).await;
    let _ = session.handle.snapshot().await;

    // Past the first deadline, before the re-armed one.
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert!(session.handle.snapshot().await.unwrap().peer(&alice).is_some());

    tokio::time::sleep(Duration::from_secs(3)).await;
    assert!(session.handle.snapshot().await.unwrap().peer(&alice).is_none());

    let timeouts = session
        .presentation
        .notifications()
        .await
        .into_iter()
        .filter(|n| matches!(n, Notification::ErrorOccurred { kind: ErrorKind::NegotiationTimedOut, .. }))
        .count();
    assert_eq!(timeouts, 1);
}

#[tokio::test(start_paused = true)]
async fn test_disabled_timeout_never_removes_peers() {
    init_tracing();

    let session = create_test_session_with(test_config().with_negotiation_timeout(None));
    session.handle.connect().await.unwrap();
    session.handle.join().await.unwrap();
    session.transport.deliver(STREAM_CHANNEL, offer_json("bob")).await;

    tokio::time::sleep(Duration::from_secs(600)).await;

    let snapshot = session.handle.snapshot().await.unwrap();
    assert!(snapshot.peer(&Identity::from("bob")).is_some());
}
