use crate::clock::Clock;
use crate::sync::MediaPlayer;
use anyhow::{Result, bail};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;
use watchmesh_core::SourceType;

/// In-memory player whose position advances with the clock while playing.
pub struct VirtualPlayer {
    clock: Arc<dyn Clock>,
    source: Option<(SourceType, String)>,
    /// Position when playback last started or stopped.
    base: f64,
    playing_since: Option<u64>,
}

impl VirtualPlayer {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            source: None,
            base: 0.0,
            playing_since: None,
        }
    }

    fn current(&self) -> f64 {
        match self.playing_since {
            Some(since) => {
                let elapsed = self.clock.now_ms().saturating_sub(since) as f64 / 1000.0;
                self.base + elapsed
            }
            None => self.base,
        }
    }
}

#[async_trait]
impl MediaPlayer for VirtualPlayer {
    async fn position(&self) -> f64 {
        self.current()
    }

    async fn is_paused(&self) -> bool {
        self.playing_since.is_none()
    }

    async fn source(&self) -> Option<(SourceType, String)> {
        self.source.clone()
    }

    async fn load(&mut self, source_type: SourceType, url: &str) -> Result<()> {
        debug!("Loading {:?} source {}", source_type, url);
        self.source = Some((source_type, url.to_owned()));
        self.base = 0.0;
        self.playing_since = None;
        Ok(())
    }

    async fn seek(&mut self, secs: f64) -> Result<()> {
        if self.source.is_none() {
            bail!("No source loaded");
        }
        self.base = secs.max(0.0);
        if self.playing_since.is_some() {
            self.playing_since = Some(self.clock.now_ms());
        }
        Ok(())
    }

    async fn play(&mut self) -> Result<()> {
        if self.source.is_none() {
            bail!("No source loaded");
        }
        if self.playing_since.is_none() {
            self.playing_since = Some(self.clock.now_ms());
        }
        Ok(())
    }

    async fn pause(&mut self) -> Result<()> {
        self.base = self.current();
        self.playing_since = None;
        Ok(())
    }
}
