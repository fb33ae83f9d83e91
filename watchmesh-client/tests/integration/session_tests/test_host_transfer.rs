use watchmesh_client::{SessionError, SessionEvent};

use crate::integration::{fixture, init_tracing};
use crate::utils::connected_pair;

#[tokio::test]
async fn test_take_host_propagates() {
    init_tracing();
    let (service, network, clock) = fixture();
    let (mut a, b) = connected_pair(&service, &network, &clock, "demo")
        .await
        .expect("pair");

    let err = b.handle.play().await.unwrap_err();
    assert!(matches!(err, SessionError::NotHost), "got {:?}", err);

    b.handle.take_host().await.expect("take host");

    a.events
        .wait_for("host change", |e| {
            matches!(e, SessionEvent::HostChanged(Some(h)) if *h == b.id)
        })
        .await
        .expect("a adopts b as host");

    let snap_a = a.handle.snapshot().await.expect("snapshot a");
    let snap_b = b.handle.snapshot().await.expect("snapshot b");
    assert!(!snap_a.is_host);
    assert!(snap_b.is_host);
    assert_eq!(snap_a.host, Some(b.id.clone()));

    let err = a.handle.pause().await.unwrap_err();
    assert!(matches!(err, SessionError::NotHost), "got {:?}", err);
    b.handle.load("https://example.com/clip.mp4").await.expect("b loads");
}
