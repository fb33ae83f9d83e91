use anyhow::{Result, bail};
use async_trait::async_trait;
use watchmesh_client::{MediaPlayer, VirtualPlayer};
use watchmesh_core::SourceType;

/// A player showing a live stream: everything works except seeking.
pub struct LivePlayer {
    inner: VirtualPlayer,
}

impl LivePlayer {
    pub fn new(inner: VirtualPlayer) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl MediaPlayer for LivePlayer {
    async fn position(&self) -> f64 {
        self.inner.position().await
    }

    async fn is_paused(&self) -> bool {
        self.inner.is_paused().await
    }

    async fn source(&self) -> Option<(SourceType, String)> {
        self.inner.source().await
    }

    async fn load(&mut self, source_type: SourceType, url: &str) -> Result<()> {
        self.inner.load(source_type, url).await
    }

    async fn seek(&mut self, _secs: f64) -> Result<()> {
        bail!("Live stream is not seekable")
    }

    async fn play(&mut self) -> Result<()> {
        self.inner.play().await
    }

    async fn pause(&mut self) -> Result<()> {
        self.inner.pause().await
    }
}
