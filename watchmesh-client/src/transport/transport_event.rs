use crate::transport::media::RemoteTrack;
use tokio::sync::mpsc;
use watchmesh_core::{IceCandidate, PeerId};
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;

/// Connection state as reported by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    New,
    Connecting,
    Connected,
    /// May recover on its own.
    Disconnected,
    Failed,
    Closed,
}

impl From<RTCPeerConnectionState> for LinkState {
    fn from(state: RTCPeerConnectionState) -> Self {
        match state {
            RTCPeerConnectionState::Unspecified | RTCPeerConnectionState::New => LinkState::New,
            RTCPeerConnectionState::Connecting => LinkState::Connecting,
            RTCPeerConnectionState::Connected => LinkState::Connected,
            RTCPeerConnectionState::Disconnected => LinkState::Disconnected,
            RTCPeerConnectionState::Failed => LinkState::Failed,
            RTCPeerConnectionState::Closed => LinkState::Closed,
        }
    }
}

/// Everything a connection reports back to the session loop.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    CandidateGenerated(PeerId, IceCandidate),
    StateChanged(PeerId, LinkState),
    DataChannelOpen(PeerId),
    DataChannelClosed(PeerId),
    Message(PeerId, String),
    TrackAdded(PeerId, RemoteTrack),
}

impl TransportEvent {
    pub fn peer_id(&self) -> &PeerId {
        match self {
            TransportEvent::CandidateGenerated(peer_id, _)
            | TransportEvent::StateChanged(peer_id, _)
            | TransportEvent::DataChannelOpen(peer_id)
            | TransportEvent::DataChannelClosed(peer_id)
            | TransportEvent::Message(peer_id, _)
            | TransportEvent::TrackAdded(peer_id, _) => peer_id,
        }
    }
}

/// A [`TransportEvent`] stamped with the id of the link that produced it.
///
/// Link ids are never reused, so events still queued from a replaced link
/// can be told apart from the current one.
#[derive(Debug, Clone)]
pub struct LinkEvent {
    pub link_id: u64,
    pub event: TransportEvent,
}

/// Sending half handed to a link at creation.
#[derive(Debug, Clone)]
pub struct EventSink {
    link_id: u64,
    tx: mpsc::Sender<LinkEvent>,
}

impl EventSink {
    pub fn new(link_id: u64, tx: mpsc::Sender<LinkEvent>) -> Self {
        Self { link_id, tx }
    }

    /// Returns false once the receiving loop is gone.
    pub async fn send(&self, event: TransportEvent) -> bool {
        self.tx
            .send(LinkEvent {
                link_id: self.link_id,
                event,
            })
            .await
            .is_ok()
    }
}
