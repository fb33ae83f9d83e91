use crate::transport::media::{LocalMedia, LocalTrack, TrackKind};
use crate::transport::transport_event::EventSink;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use watchmesh_core::{IceCandidate, IceServerConfig, PeerId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Opens the chat channel and sends the offer.
    Initiator,
    Responder,
}

/// One connection to one remote peer.
#[async_trait]
pub trait PeerLink: Send + Sync {
    /// Create an offer and install it as the local description.
    async fn create_offer(&self) -> Result<String>;

    /// Install a remote offer and return the local answer.
    async fn accept_offer(&self, sdp: String) -> Result<String>;

    async fn accept_answer(&self, sdp: String) -> Result<()>;

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()>;

    /// Swap what the outbound `kind` sender transmits without renegotiating.
    /// `None` sends silence/black. Returns false when the link has no sender
    /// of that kind.
    async fn replace_track(&self, kind: TrackKind, track: Option<LocalTrack>) -> Result<bool>;

    /// Send UTF-8 text over the chat channel.
    async fn send_text(&self, text: &str) -> Result<()>;

    /// Close the connection. A closed link reports no further events.
    async fn close(&self) -> Result<()>;
}

/// Creates [`PeerLink`]s. Every link reports to `events`, tagged with the
/// remote peer id it was created for and the sink's link id.
#[async_trait]
pub trait PeerConnector: Send + Sync {
    async fn connect(
        &self,
        peer_id: PeerId,
        role: Role,
        media: &LocalMedia,
        events: EventSink,
    ) -> Result<Arc<dyn PeerLink>>;

    fn update_ice_servers(&mut self, _ice_servers: Vec<IceServerConfig>) {}
}
