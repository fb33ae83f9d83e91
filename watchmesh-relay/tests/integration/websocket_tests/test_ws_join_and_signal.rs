use watchmesh_core::{ClientMessage, IceServerConfig, PeerId, RelayMessage, RoomId, SignalPayload};
use watchmesh_relay::RelayService;

use crate::integration::init_tracing;
use crate::utils::{WsTestClient, spawn_relay};

async fn welcome(client: &mut WsTestClient) -> PeerId {
    loop {
        match client.recv().await.expect("frame") {
            RelayMessage::Welcome { peer_id } => return peer_id,
            RelayMessage::IceConfig { .. } => continue,
            other => panic!("expected welcome, got {:?}", other),
        }
    }
}

#[tokio::test]
async fn test_ws_join_and_signal() {
    init_tracing();

    let service = RelayService::default();
    let addr = spawn_relay(service.clone()).await.expect("relay");

    let mut a = WsTestClient::connect(addr).await.expect("connect a");
    let a_id = welcome(&mut a).await;
    a.send(&ClientMessage::Join {
        room: RoomId::from("demo"),
    })
    .await
    .expect("join a");
    assert_eq!(
        a.recv().await.expect("peers"),
        RelayMessage::Peers { peers: vec![] }
    );

    let mut b = WsTestClient::connect(addr).await.expect("connect b");
    let b_id = welcome(&mut b).await;
    b.send(&ClientMessage::Join {
        room: RoomId::from("demo"),
    })
    .await
    .expect("join b");
    assert_eq!(
        b.recv().await.expect("peers"),
        RelayMessage::Peers {
            peers: vec![a_id.clone()]
        }
    );
    assert_eq!(
        a.recv().await.expect("peer-joined"),
        RelayMessage::PeerJoined {
            peer_id: b_id.clone()
        }
    );

    b.send(&ClientMessage::Signal {
        to: a_id.clone(),
        data: SignalPayload::Offer { sdp: "v=0".into() },
    })
    .await
    .expect("signal");
    assert_eq!(
        a.recv().await.expect("signal"),
        RelayMessage::Signal {
            from: b_id.clone(),
            data: SignalPayload::Offer { sdp: "v=0".into() },
        }
    );

    b.close().await.expect("close b");
    assert_eq!(
        a.recv().await.expect("peer-left"),
        RelayMessage::PeerLeft { peer_id: b_id }
    );
}

#[tokio::test]
async fn test_ws_announces_ice_servers() {
    init_tracing();

    let service = RelayService::new(vec![IceServerConfig::stun("stun:stun.example.org:3478")]);
    let addr = spawn_relay(service).await.expect("relay");

    let mut client = WsTestClient::connect(addr).await.expect("connect");
    assert!(matches!(
        client.recv().await.expect("welcome"),
        RelayMessage::Welcome { .. }
    ));
    match client.recv().await.expect("ice-config") {
        RelayMessage::IceConfig { ice_servers } => {
            assert_eq!(ice_servers[0].urls, vec!["stun:stun.example.org:3478".to_string()]);
        }
        other => panic!("unexpected {:?}", other),
    }
}
