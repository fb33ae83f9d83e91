use crate::chat::ChatRoute;
use crate::error::SessionError;
use crate::session::session_command::SessionCommand;
use crate::session::session_event::{JoinInfo, SessionSnapshot};
use crate::transport::{LocalMedia, LocalTrack, TrackKind};
use tokio::sync::{mpsc, oneshot};
use watchmesh_core::{RoomId, SourceType};

/// Cloneable front door to a running [`Session`](crate::Session).
///
/// Every call fails with [`SessionError::SessionClosed`] once the session
/// loop has stopped.
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<SessionCommand>,
}

impl SessionHandle {
    pub(crate) fn new(tx: mpsc::Sender<SessionCommand>) -> Self {
        Self { tx }
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> SessionCommand,
    ) -> Result<T, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(build(reply))
            .await
            .map_err(|_| SessionError::SessionClosed)?;
        rx.await.map_err(|_| SessionError::SessionClosed)
    }

    /// Join `room` and wait for the relay's roster.
    pub async fn join(&self, room: impl Into<RoomId>) -> Result<JoinInfo, SessionError> {
        let room = room.into();
        self.request(|reply| SessionCommand::Join { room, reply })
            .await?
    }

    /// Claim host authority and announce it to the room.
    pub async fn take_host(&self) -> Result<(), SessionError> {
        self.request(|reply| SessionCommand::TakeHost { reply })
            .await?
    }

    pub async fn load(&self, url: impl Into<String>) -> Result<(), SessionError> {
        let url = url.into();
        self.request(|reply| SessionCommand::Load {
            source_type: None,
            url,
            reply,
        })
        .await?
    }

    pub async fn load_as(
        &self,
        source_type: SourceType,
        url: impl Into<String>,
    ) -> Result<(), SessionError> {
        let url = url.into();
        self.request(|reply| SessionCommand::Load {
            source_type: Some(source_type),
            url,
            reply,
        })
        .await?
    }

    pub async fn play(&self) -> Result<(), SessionError> {
        self.request(|reply| SessionCommand::Play { reply }).await?
    }

    pub async fn pause(&self) -> Result<(), SessionError> {
        self.request(|reply| SessionCommand::Pause { reply }).await?
    }

    pub async fn seek(&self, time: f64) -> Result<(), SessionError> {
        self.request(|reply| SessionCommand::Seek { time, reply })
            .await?
    }

    /// Seek relative to the current position, never before 0.
    pub async fn seek_by(&self, delta: f64) -> Result<(), SessionError> {
        self.request(|reply| SessionCommand::SeekBy { delta, reply })
            .await?
    }

    /// Returns `None` when the text was blank and nothing was sent.
    pub async fn send_chat(
        &self,
        text: impl Into<String>,
    ) -> Result<Option<ChatRoute>, SessionError> {
        let text = text.into();
        self.request(|reply| SessionCommand::SendChat { text, reply })
            .await?
    }

    /// Tracks to attach to connections opened after this call.
    pub async fn set_local_media(&self, media: LocalMedia) -> Result<(), SessionError> {
        self.request(|reply| SessionCommand::SetLocalMedia { media, reply })
            .await
    }

    /// Swap the local track of the same kind on every connection, e.g. the
    /// camera for a screen capture and back. Returns how many connections
    /// took the new track; 0 while that kind is muted.
    pub async fn replace_track(&self, track: LocalTrack) -> Result<usize, SessionError> {
        self.request(|reply| SessionCommand::ReplaceTrack { track, reply })
            .await
    }

    /// Stop sending `kind` on every connection, current and future.
    pub async fn mute(&self, kind: TrackKind) -> Result<usize, SessionError> {
        self.request(|reply| SessionCommand::SetTrackEnabled {
            kind,
            enabled: false,
            reply,
        })
        .await
    }

    pub async fn unmute(&self, kind: TrackKind) -> Result<usize, SessionError> {
        self.request(|reply| SessionCommand::SetTrackEnabled {
            kind,
            enabled: true,
            reply,
        })
        .await
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        self.request(|reply| SessionCommand::Snapshot { reply })
            .await
    }

    /// Close every connection, disconnect from the relay and stop the loop.
    pub async fn leave(&self) -> Result<(), SessionError> {
        self.request(|reply| SessionCommand::Leave { reply }).await
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
