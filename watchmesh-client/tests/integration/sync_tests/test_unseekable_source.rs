use std::sync::Arc;
use watchmesh_client::{SessionEvent, VirtualPlayer};
use watchmesh_core::{BroadcastPayload, SourceType, WatchEvent};

use crate::integration::{fixture, init_tracing};
use crate::utils::{LivePlayer, RawPeer, START_MS, TestSession, test_config};

const STREAM_URL: &str = "https://example.com/live.m3u8";

fn applied(action: &'static str) -> impl Fn(&SessionEvent) -> bool {
    move |e: &SessionEvent| matches!(e, SessionEvent::WatchApplied { action: a, .. } if *a == action)
}

#[tokio::test]
async fn test_load_counts_as_applied_when_its_seek_is_rejected() {
    init_tracing();
    let (service, network, clock) = fixture();

    let mut host = RawPeer::connect(&service).await.expect("raw");
    host.join("demo").await.expect("raw joins");

    let player = Box::new(LivePlayer::new(VirtualPlayer::new(Arc::new(clock.clone()))));
    let mut b = TestSession::start_with_player(&service, &network, &clock, test_config(), player)
        .await
        .expect("b");
    b.handle.join("demo").await.expect("b joins");

    host.broadcast(&BroadcastPayload::Watch(WatchEvent::Load {
        source_type: SourceType::Url,
        url: STREAM_URL.into(),
        at: START_MS,
        time: Some(12.0),
    }))
    .expect("load");
    b.events
        .wait_for("load", applied("load"))
        .await
        .expect("load applied");

    let snap = b.handle.snapshot().await.expect("snapshot");
    assert_eq!(snap.source, Some((SourceType::Url, STREAM_URL.to_owned())));
    assert_eq!(snap.position, 0.0);

    // a bare seek does nothing on a live stream; play still goes through
    host.broadcast(&BroadcastPayload::Watch(WatchEvent::Seek {
        at: START_MS,
        time: 30.0,
    }))
    .expect("seek");
    host.broadcast(&BroadcastPayload::Watch(WatchEvent::Play {
        at: START_MS,
        time: 30.0,
    }))
    .expect("play");
    b.events
        .wait_for("play", applied("play"))
        .await
        .expect("play applied");

    assert_eq!(b.events.count(applied("seek")), 0);
    assert!(!b.handle.snapshot().await.expect("snapshot").paused);
}
