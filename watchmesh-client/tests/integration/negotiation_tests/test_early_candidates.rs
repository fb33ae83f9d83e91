use watchmesh_client::PeerState;
use watchmesh_core::{IceCandidate, PeerId, RelayMessage, SignalPayload};

use crate::integration::{fixture, init_tracing};
use crate::utils::{EXTERNAL_OFFER, RawPeer, TestSession, eventually};

fn candidate(port: u16) -> SignalPayload {
    SignalPayload::Candidate(IceCandidate {
        candidate: format!("candidate:1 1 udp 2122260223 192.168.1.20 {} typ host", port),
        sdp_mid: Some("0".into()),
        sdp_m_line_index: Some(0),
    })
}

fn is_answer_from(m: &RelayMessage, peer: &PeerId) -> bool {
    matches!(
        m,
        RelayMessage::Signal { from, data: SignalPayload::Answer { .. } } if from == peer
    )
}

#[tokio::test]
async fn test_candidates_before_offer_are_queued() {
    init_tracing();
    let (service, network, clock) = fixture();

    let a = TestSession::start(&service, &network, &clock).await.expect("a");
    a.handle.join("demo").await.expect("a joins");
    let mut r = RawPeer::connect(&service).await.expect("raw");
    r.join("demo").await.expect("raw joins");

    r.signal(&a.id, candidate(50001));
    r.signal(
        &a.id,
        SignalPayload::Offer {
            sdp: EXTERNAL_OFFER.into(),
        },
    );
    r.signal(&a.id, candidate(50002));

    r.recv_until("answer", |m| is_answer_from(m, &a.id))
        .await
        .expect("answer");

    eventually("both candidates applied", || async {
        network.candidates_applied().await == 2
    })
    .await
    .expect("applied");
    assert_eq!(network.early_candidates().await, 0);

    let snap = a.handle.snapshot().await.expect("snapshot");
    assert_eq!(snap.peer_state(&r.peer_id), Some(PeerState::Negotiating));
}

#[tokio::test]
async fn test_second_offer_restarts_negotiation() {
    init_tracing();
    let (service, network, clock) = fixture();

    let a = TestSession::start(&service, &network, &clock).await.expect("a");
    a.handle.join("demo").await.expect("a joins");
    let mut r = RawPeer::connect(&service).await.expect("raw");
    r.join("demo").await.expect("raw joins");

    for _ in 0..2 {
        r.signal(
            &a.id,
            SignalPayload::Offer {
                sdp: EXTERNAL_OFFER.into(),
            },
        );
        r.recv_until("answer", |m| is_answer_from(m, &a.id))
            .await
            .expect("answer");
    }

    let snap = a.handle.snapshot().await.expect("snapshot");
    assert_eq!(snap.peers.len(), 1);
    assert_eq!(snap.peer_state(&r.peer_id), Some(PeerState::Negotiating));
}
