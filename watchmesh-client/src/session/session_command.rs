use crate::chat::ChatRoute;
use crate::error::SessionError;
use crate::session::session_event::{JoinInfo, SessionSnapshot};
use crate::transport::{LocalMedia, LocalTrack, TrackKind};
use tokio::sync::oneshot;
use watchmesh_core::{RoomId, SourceType};

type Reply<T> = oneshot::Sender<Result<T, SessionError>>;

pub enum SessionCommand {
    Join {
        room: RoomId,
        reply: Reply<JoinInfo>,
    },
    TakeHost {
        reply: Reply<()>,
    },
    Load {
        /// Detected from the URL when absent.
        source_type: Option<SourceType>,
        url: String,
        reply: Reply<()>,
    },
    Play {
        reply: Reply<()>,
    },
    Pause {
        reply: Reply<()>,
    },
    Seek {
        time: f64,
        reply: Reply<()>,
    },
    SeekBy {
        delta: f64,
        reply: Reply<()>,
    },
    SendChat {
        text: String,
        reply: Reply<Option<ChatRoute>>,
    },
    SetLocalMedia {
        media: LocalMedia,
        reply: oneshot::Sender<()>,
    },
    /// Replies with the number of connections now sending the new track.
    ReplaceTrack {
        track: LocalTrack,
        reply: oneshot::Sender<usize>,
    },
    SetTrackEnabled {
        kind: TrackKind,
        enabled: bool,
        reply: oneshot::Sender<usize>,
    },
    Snapshot {
        reply: oneshot::Sender<SessionSnapshot>,
    },
    Leave {
        reply: oneshot::Sender<()>,
    },
}
