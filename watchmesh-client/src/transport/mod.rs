mod connection_wrapper;
mod media;
mod peer_link;
mod transport_config;
mod transport_event;

pub use connection_wrapper::{CHAT_CHANNEL_LABEL, ConnectionWrapper, RtcConnector};
pub use media::{LocalMedia, LocalTrack, RemoteStream, RemoteTrack, TrackKind};
pub use peer_link::{PeerConnector, PeerLink, Role};
pub use transport_config::TransportConfig;
pub use transport_event::{EventSink, LinkEvent, LinkState, TransportEvent};
