use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use watchmesh_client::{
    RelayChannel, SessionConfig, SessionEvent, SystemClock, VirtualPlayer, WsRelay,
};
use watchmesh_core::{ClientMessage, IceServerConfig, RelayMessage, RoomId};
use watchmesh_relay::{RelayService, router};

use crate::integration::init_tracing;
use crate::utils::EventLog;

async fn spawn_relay(service: RelayService) -> Result<SocketAddr> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, router(service)).await;
    });
    Ok(addr)
}

async fn next(rx: &mut mpsc::UnboundedReceiver<RelayMessage>) -> Result<RelayMessage> {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .context("Timeout waiting for relay frame")?
        .context("Relay socket closed")
}

#[tokio::test]
async fn test_ws_relay_round_trip() {
    init_tracing();
    let service = RelayService::new(vec![IceServerConfig::stun("stun:stun.example.org:3478")]);
    let addr = spawn_relay(service.clone()).await.expect("relay");
    let url = format!("ws://{}/ws", addr);

    let (relay, mut rx) = WsRelay::connect(&url).await.expect("connect");

    let peer_id = match next(&mut rx).await.expect("welcome") {
        RelayMessage::Welcome { peer_id } => peer_id,
        other => panic!("Expected welcome, got {:?}", other),
    };
    match next(&mut rx).await.expect("ice config") {
        RelayMessage::IceConfig { ice_servers } => assert_eq!(ice_servers.len(), 1),
        other => panic!("Expected ice config, got {:?}", other),
    }

    relay
        .send(ClientMessage::Join {
            room: RoomId::from("lobby"),
        })
        .await
        .expect("join");
    match next(&mut rx).await.expect("peers") {
        RelayMessage::Peers { peers } => assert!(peers.is_empty()),
        other => panic!("Expected peers, got {:?}", other),
    }
    assert_eq!(service.members(&RoomId::from("lobby")), vec![peer_id]);

    relay.disconnect().await;
    tokio::time::timeout(Duration::from_secs(2), async {
        while service.peer_count() > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("relay dropped the connection");
}

#[tokio::test]
async fn test_connect_solo_join_is_host() {
    init_tracing();
    let addr = spawn_relay(RelayService::default()).await.expect("relay");
    let url = format!("ws://{}/ws", addr);

    let player = Box::new(VirtualPlayer::new(std::sync::Arc::new(SystemClock)));
    let (handle, events) = watchmesh_client::connect(&url, SessionConfig::default(), player)
        .await
        .expect("connect");
    let mut events = EventLog::new(events);

    events
        .wait_for("welcome", |e| matches!(e, SessionEvent::Welcome(_)))
        .await
        .expect("welcome");

    let info = handle.join("solo").await.expect("join");
    assert!(info.is_host);
    assert_eq!(info.participants, vec![info.self_id.clone()]);

    handle
        .load("https://example.com/movie.mp4")
        .await
        .expect("host may load");
    handle.leave().await.expect("leave");
    events
        .wait_for("left", |e| matches!(e, SessionEvent::Left))
        .await
        .expect("left");
}
