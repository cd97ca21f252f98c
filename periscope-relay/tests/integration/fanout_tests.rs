use periscope_client::{TransportAdapter, WsTransport};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::integration::{
    RELAY_TIMEOUT_MS, init_tracing, recv_payload, relay_url, start_relay, wait_for_subscribers,
};

#[tokio::test]
async fn test_publish_fans_out_to_all_subscribers() {
    init_tracing();

    let (addr, service) = start_relay().await;
    let (tx_a, mut rx_a) = mpsc::unbounded_channel();
    let (tx_b, mut rx_b) = mpsc::unbounded_channel();
    let a = WsTransport::new();
    let b = WsTransport::new();
    a.connect(&relay_url(addr), tx_a).await.expect("a failed to connect");
    b.connect(&relay_url(addr), tx_b).await.expect("b failed to connect");

    a.subscribe("room").await.unwrap();
    b.subscribe("room").await.unwrap();
    assert!(wait_for_subscribers(&service, "room", 2).await);

    a.publish("room", "hello".to_owned()).await.unwrap();

    // The publisher hears its own message too.
    assert!(recv_payload(&mut rx_a, "room", |p| p == "hello").await.is_some());
    assert!(recv_payload(&mut rx_b, "room", |p| p == "hello").await.is_some());

    a.disconnect().await.unwrap();
    b.disconnect().await.unwrap();
}

#[tokio::test]
async fn test_unsubscribed_connection_stops_receiving() {
    init_tracing();

    let (addr, service) = start_relay().await;
    let (tx_a, mut rx_a) = mpsc::unbounded_channel();
    let (tx_b, mut rx_b) = mpsc::unbounded_channel();
    let a = WsTransport::new();
    let b = WsTransport::new();
    a.connect(&relay_url(addr), tx_a).await.unwrap();
    b.connect(&relay_url(addr), tx_b).await.unwrap();
    a.subscribe("room").await.unwrap();
    b.subscribe("room").await.unwrap();
    assert!(wait_for_subscribers(&service, "room", 2).await);

    b.unsubscribe("room").await.unwrap();
    assert!(wait_for_subscribers(&service, "room", 1).await);
    b.publish("room", "first".to_owned()).await.unwrap();
    b.publish("room", "second".to_owned()).await.unwrap();

    assert!(recv_payload(&mut rx_a, "room", |p| p == "second").await.is_some());
    let stray = tokio::time::timeout(Duration::from_millis(200), rx_b.recv()).await;
    assert!(stray.is_err(), "unsubscribed connection received {:?}", stray);
}

#[tokio::test]
async fn test_closed_connections_are_forgotten() {
    init_tracing();

    let (addr, service) = start_relay().await;
    let (tx, _rx) = mpsc::unbounded_channel();
    let transport = WsTransport::new();
    transport.connect(&relay_url(addr), tx).await.unwrap();
    transport.subscribe("room").await.unwrap();
    assert!(wait_for_subscribers(&service, "room", 1).await);

    transport.disconnect().await.unwrap();

    assert!(wait_for_subscribers(&service, "room", 0).await);
    let deadline = tokio::time::Instant::now() + Duration::from_millis(RELAY_TIMEOUT_MS);
    while service.connection_count() > 0 && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(service.connection_count(), 0);
}
