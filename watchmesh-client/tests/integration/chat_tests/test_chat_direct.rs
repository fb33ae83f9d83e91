use std::time::Duration;
use watchmesh_client::{ChatRoute, SessionError, SessionEvent};

use crate::integration::{fixture, init_tracing};
use crate::utils::{RawPeer, TestSession, chat_broadcasts, connected_pair};

#[tokio::test]
async fn test_chat_goes_over_data_channels_only() {
    init_tracing();
    let (service, network, clock) = fixture();
    let (a, mut b) = connected_pair(&service, &network, &clock, "demo")
        .await
        .expect("pair");

    let mut observer = RawPeer::connect(&service).await.expect("observer");
    observer.join("demo").await.expect("observer joins");

    let route = a.handle.send_chat("  hello  ").await.expect("send");
    assert_eq!(route, Some(ChatRoute::Direct { delivered: 1 }));

    match b
        .events
        .wait_for("chat", |e| matches!(e, SessionEvent::ChatReceived(_)))
        .await
        .expect("chat received")
    {
        SessionEvent::ChatReceived(msg) => {
            assert_eq!(msg.from, a.id);
            assert_eq!(msg.text, "hello");
        }
        other => panic!("unexpected {:?}", other),
    }

    // a direct send never duplicates through the relay
    let frames = observer.collect_for(Duration::from_millis(300)).await;
    assert!(chat_broadcasts(&frames).is_empty());

    let history = a.handle.snapshot().await.expect("snapshot").chat;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].from, a.id);
    assert_eq!(history[0].text, "hello");
}

#[tokio::test]
async fn test_chat_requires_room() {
    init_tracing();
    let (service, network, clock) = fixture();
    let a = TestSession::start(&service, &network, &clock).await.expect("a");

    let err = a.handle.send_chat("anyone?").await.unwrap_err();
    assert!(matches!(err, SessionError::NotJoined));
}
