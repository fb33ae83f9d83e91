use watchmesh_core::{RelayMessage, RoomId};
use watchmesh_relay::RelayService;

use crate::integration::init_tracing;
use crate::utils::TestPeer;

#[tokio::test]
async fn test_rejoin_moves_rooms() {
    init_tracing();

    let service = RelayService::default();
    let mut a = TestPeer::connect(&service).await.expect("connect a");
    let mut b = TestPeer::connect(&service).await.expect("connect b");

    a.join("demo").await.expect("join a");
    b.join("demo").await.expect("join b");
    a.recv().await.expect("a: b joined");

    let roster = b.join("cinema").await.expect("b moves");
    assert!(roster.is_empty());

    match a.recv().await.expect("peer-left") {
        RelayMessage::PeerLeft { peer_id } => assert_eq!(peer_id, b.peer_id),
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(service.members(&RoomId::from("demo")), vec![a.peer_id.clone()]);
    assert_eq!(service.members(&RoomId::from("cinema")), vec![b.peer_id.clone()]);
}
