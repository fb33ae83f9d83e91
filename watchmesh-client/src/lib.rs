pub mod chat;
pub mod clock;
pub mod config;
pub mod error;
pub mod membership;
pub mod peer;
pub mod relay;
pub mod session;
pub mod sync;
pub mod transport;

pub use chat::{ChatHistory, ChatRoute};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::SessionConfig;
pub use error::SessionError;
pub use membership::Membership;
pub use peer::{ManagerEvent, PeerConnectionManager, PeerState};
pub use relay::{RelayChannel, WsRelay};
pub use session::{
    JoinInfo, Session, SessionCommand, SessionEvent, SessionHandle, SessionSnapshot, connect,
};
pub use sync::{MediaPlayer, PlaybackSync, PlayerCommand, VirtualPlayer};
pub use transport::{
    ConnectionWrapper, EventSink, LinkEvent, LinkState, LocalMedia, LocalTrack, PeerConnector,
    PeerLink, RemoteStream, RemoteTrack, Role, RtcConnector, TrackKind, TransportConfig,
    TransportEvent,
};
