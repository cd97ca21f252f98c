use periscope_client::core::{Identity, SdpMessage, SignalMessage, decode, encode};
use periscope_client::{
    ChannelPresentation, HandleTag, MediaConfig, MediaEngine, PeerObserver, RoomState, SdpKind,
    Session, SessionConfig, TransportAdapter, WebRtcMediaEngine, WsTransport,
};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::integration::{init_tracing, recv_payload, relay_url, start_relay, wait_for_subscribers};

const STREAM_CHANNEL: &str = "stream-signals";
const VIEWER_CHANNEL: &str = "viewer-signals";

fn local_engine() -> Arc<WebRtcMediaEngine> {
    Arc::new(WebRtcMediaEngine::new(MediaConfig { ice_servers: vec![] }).expect("media engine"))
}

#[tokio::test]
async fn test_viewer_answers_streamer_offer_through_relay() {
    init_tracing();

    let (addr, service) = start_relay().await;

    // Streamer side: a bare transport listening for viewer traffic.
    let (streamer_tx, mut streamer_rx) = mpsc::unbounded_channel();
    let streamer = WsTransport::new();
    streamer.connect(&relay_url(addr), streamer_tx).await.unwrap();
    streamer.subscribe(VIEWER_CHANNEL).await.unwrap();
    assert!(wait_for_subscribers(&service, VIEWER_CHANNEL, 1).await);

    // Viewer side: a full session over the same relay.
    let (presentation, _notifications) = ChannelPresentation::new();
    let viewer = Session::spawn(
        SessionConfig::new(relay_url(addr)).with_identity("viewer"),
        Arc::new(WsTransport::new()),
        local_engine(),
        Arc::new(presentation),
    );
    viewer.connect().await.expect("viewer connect failed");
    viewer.join().await.expect("viewer join failed");

    let join = recv_payload(&mut streamer_rx, VIEWER_CHANNEL, |p| {
        matches!(decode(p), Ok(SignalMessage::JoinRequest(_)))
    })
    .await;
    assert!(join.is_some(), "streamer never saw the join request");

    let (peer_tx, _peer_rx) = mpsc::unbounded_channel();
    let streamer_id = Identity::from("streamer");
    let viewer_id = Identity::from("viewer");
    let streamer_peer = local_engine()
        .create_peer(
            &viewer_id,
            PeerObserver::new(viewer_id.clone(), HandleTag { epoch: 1, serial: 0 }, peer_tx),
        )
        .await
        .unwrap();
    let offer = streamer_peer.create_offer().await.unwrap();
    streamer_peer
        .set_local_description(SdpKind::Offer, offer.clone())
        .await
        .unwrap();
    streamer
        .publish(
            STREAM_CHANNEL,
            encode(&SignalMessage::Offer(SdpMessage {
                from: streamer_id.clone(),
                to: Some(viewer_id.clone()),
                sdp: offer,
                video_source: "cam-1".to_owned(),
            })),
        )
        .await
        .unwrap();

    let answer = recv_payload(&mut streamer_rx, VIEWER_CHANNEL, |p| {
        matches!(decode(p), Ok(SignalMessage::Answer(_)))
    })
    .await
    .expect("viewer never answered");
    let Ok(SignalMessage::Answer(answer)) = decode(&answer) else {
        unreachable!()
    };
    assert_eq!(answer.from, viewer_id);
    assert_eq!(answer.to, Some(streamer_id.clone()));
    assert_eq!(answer.video_source, "cam-1");
    assert!(answer.sdp.starts_with("v=0"));

    streamer_peer
        .set_remote_description(SdpKind::Answer, answer.sdp)
        .await
        .expect("streamer rejected the answer");

    let snapshot = viewer.snapshot().await.unwrap();
    assert_eq!(snapshot.room, RoomState::Joined);
    assert!(snapshot.peer(&streamer_id).is_some());
    assert!(snapshot.connected_peers.contains(&streamer_id));

    viewer.shutdown().await;
    streamer_peer.close().await.unwrap();
    assert!(wait_for_subscribers(&service, STREAM_CHANNEL, 0).await);
}
