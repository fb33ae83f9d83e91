use crate::peer::PeerState;
use crate::transport::{RemoteStream, TrackKind};
use watchmesh_core::{ChatMessage, PeerId, RoomId, SourceType};

/// Result of a successful join.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinInfo {
    pub room: RoomId,
    pub self_id: PeerId,
    pub is_host: bool,
    /// Self first, then the other members in join order.
    pub participants: Vec<PeerId>,
}

/// Notifications from the session loop to the application.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// The relay assigned our id.
    Welcome(PeerId),
    Joined(JoinInfo),
    PeerJoined(PeerId),
    PeerLeft(PeerId),
    PeerConnected(PeerId),
    /// The connection to the peer was torn down.
    PeerRemoved(PeerId),
    ChannelOpened(PeerId),
    ChannelClosed(PeerId),
    StreamUpdated {
        peer_id: PeerId,
        stream: RemoteStream,
    },
    HostChanged(Option<PeerId>),
    WatchApplied {
        from: PeerId,
        action: &'static str,
    },
    DriftCorrected {
        from: PeerId,
        target: f64,
    },
    ChatReceived(ChatMessage),
    /// The relay connection dropped; the session has stopped.
    RelayLost,
    Left,
}

/// Point-in-time view of a session.
#[derive(Debug, Clone, Default)]
pub struct SessionSnapshot {
    pub self_id: Option<PeerId>,
    pub room: Option<RoomId>,
    pub is_host: bool,
    pub host: Option<PeerId>,
    pub participants: Vec<PeerId>,
    pub peers: Vec<(PeerId, PeerState)>,
    pub open_channels: usize,
    pub position: f64,
    pub paused: bool,
    /// What the player has loaded, if anything.
    pub source: Option<(SourceType, String)>,
    /// Local track kinds currently muted.
    pub muted: Vec<TrackKind>,
    pub chat: Vec<ChatMessage>,
}

impl SessionSnapshot {
    pub fn peer_state(&self, peer_id: &PeerId) -> Option<PeerState> {
        self.peers
            .iter()
            .find(|(id, _)| id == peer_id)
            .map(|(_, state)| *state)
    }

    pub fn is_joined(&self) -> bool {
        self.room.is_some() && !self.participants.is_empty()
    }
}
