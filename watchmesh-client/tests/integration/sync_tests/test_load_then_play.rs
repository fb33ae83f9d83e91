use watchmesh_client::SessionEvent;
use watchmesh_core::SourceType;

use crate::integration::{fixture, init_tracing};
use crate::utils::connected_pair;

#[tokio::test]
async fn test_receivers_follow_load_seek_play() {
    init_tracing();
    let (service, network, clock) = fixture();
    let (a, mut b) = connected_pair(&service, &network, &clock, "demo")
        .await
        .expect("pair");

    a.handle
        .load_as(SourceType::Url, "https://example.com/movie.mp4")
        .await
        .expect("load");
    a.handle.seek(30.0).await.expect("seek");
    a.handle.play().await.expect("play");

    for action in ["load", "seek", "play"] {
        b.events
            .wait_for(action, |e| {
                matches!(e, SessionEvent::WatchApplied { action: applied, .. } if *applied == action)
            })
            .await
            .unwrap_or_else(|_| panic!("{} not applied", action));
    }

    let snap = b.handle.snapshot().await.expect("snapshot");
    assert!(!snap.paused);
    assert!((snap.position - 30.0).abs() <= 0.5, "position {}", snap.position);

    // both players advance with the clock
    clock.advance(2_000);
    let snap_a = a.handle.snapshot().await.expect("snapshot a");
    let snap_b = b.handle.snapshot().await.expect("snapshot b");
    assert!((snap_a.position - 32.0).abs() < 1e-9);
    assert!((snap_b.position - snap_a.position).abs() <= 0.5);
}

#[tokio::test]
async fn test_seek_by_clamps_at_zero() {
    init_tracing();
    let (service, network, clock) = fixture();
    let (a, mut b) = connected_pair(&service, &network, &clock, "demo")
        .await
        .expect("pair");

    a.handle
        .load("https://youtu.be/dQw4w9WgXcQ")
        .await
        .expect("load");
    a.handle.seek_by(10.0).await.expect("forward");
    a.handle.seek_by(-25.0).await.expect("back");

    assert_eq!(a.handle.snapshot().await.expect("snapshot").position, 0.0);

    b.events
        .wait_for("forward", |e| {
            matches!(e, SessionEvent::WatchApplied { action: "seek", .. })
        })
        .await
        .expect("forward applied");

    b.events
        .wait_for("rewind", |e| {
            matches!(e, SessionEvent::WatchApplied { action: "seek", .. })
        })
        .await
        .expect("rewind applied");
    assert_eq!(b.handle.snapshot().await.expect("snapshot").position, 0.0);
}
