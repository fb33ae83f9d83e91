use watchmesh_core::{RelayMessage, RoomId};
use watchmesh_relay::RelayService;

use crate::integration::init_tracing;
use crate::utils::TestPeer;

#[tokio::test]
async fn test_peer_leaves_others_stay() {
    init_tracing();

    let service = RelayService::default();
    let mut a = TestPeer::connect(&service).await.expect("connect a");
    let mut b = TestPeer::connect(&service).await.expect("connect b");
    let mut c = TestPeer::connect(&service).await.expect("connect c");

    a.join("demo").await.expect("join a");
    b.join("demo").await.expect("join b");
    let roster = c.join("demo").await.expect("join c");
    assert_eq!(roster, vec![a.peer_id.clone(), b.peer_id.clone()]);

    // drain the joined notifications
    a.recv().await.expect("a: b joined");
    a.recv().await.expect("a: c joined");
    b.recv().await.expect("b: c joined");

    let b_id = b.peer_id.clone();
    b.disconnect();

    for peer in [&mut a, &mut c] {
        match peer.recv().await.expect("peer-left") {
            RelayMessage::PeerLeft { peer_id } => assert_eq!(peer_id, b_id),
            other => panic!("unexpected {:?}", other),
        }
    }

    let members = service.members(&RoomId::from("demo"));
    assert_eq!(members, vec![a.peer_id.clone(), c.peer_id.clone()]);
    assert_eq!(service.peer_count(), 2);
}
