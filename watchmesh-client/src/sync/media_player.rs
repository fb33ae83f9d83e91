use anyhow::Result;
use async_trait::async_trait;
use watchmesh_core::SourceType;

/// The local media element the session keeps in sync.
#[async_trait]
pub trait MediaPlayer: Send + Sync {
    /// Current position in seconds.
    async fn position(&self) -> f64;

    async fn is_paused(&self) -> bool;

    /// The loaded source, if any.
    async fn source(&self) -> Option<(SourceType, String)>;

    /// Switch to a new source. The player is left paused at 0.
    async fn load(&mut self, source_type: SourceType, url: &str) -> Result<()>;

    /// Fails while no source is ready.
    async fn seek(&mut self, secs: f64) -> Result<()>;

    async fn play(&mut self) -> Result<()>;

    async fn pause(&mut self) -> Result<()>;
}
