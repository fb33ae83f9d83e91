mod chat;
mod peer;
mod relay;
mod room;
mod signaling;
mod watch;

pub use chat::{BroadcastPayload, ChatMessage};
pub use peer::PeerId;
pub use relay::{ClientMessage, RelayMessage};
pub use room::RoomId;
pub use signaling::{IceCandidate, IceServerConfig, SignalPayload};
pub use watch::{SourceType, WatchEvent, extract_youtube_id};
