use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("only the host can control playback")]
    NotHost,

    #[error("not joined to a room")]
    NotJoined,

    #[error("relay error: {0}")]
    Relay(String),

    #[error("failed to encode message: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("transport error: {0:#}")]
    Transport(#[from] anyhow::Error),

    #[error("session is closed")]
    SessionClosed,
}
