use crate::sync::DRIFT_THRESHOLD_SECS;
use watchmesh_core::{SourceType, WatchEvent};

/// Instruction for the local [`MediaPlayer`](crate::sync::MediaPlayer).
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerCommand {
    Load { source_type: SourceType, url: String },
    Seek(f64),
    Play,
    Pause,
}

impl PlayerCommand {
    /// True for the command that performs `event` itself rather than
    /// preparing for it.
    pub fn carries(&self, event: &WatchEvent) -> bool {
        matches!(
            (self, event),
            (PlayerCommand::Load { .. }, WatchEvent::Load { .. })
                | (PlayerCommand::Play, WatchEvent::Play { .. })
                | (PlayerCommand::Pause, WatchEvent::Pause { .. })
                | (
                    PlayerCommand::Seek(_),
                    WatchEvent::Seek { .. } | WatchEvent::StateSync { .. }
                )
        )
    }
}

/// One-way delay estimate in seconds, assuming synchronized wall clocks.
/// Negative skew clamps to zero.
pub fn latency_secs(now_ms: u64, at_ms: u64) -> f64 {
    now_ms.saturating_sub(at_ms) as f64 / 1000.0
}

/// Turns received watch events into player commands.
#[derive(Debug, Clone, Copy)]
pub struct PlaybackSync {
    drift_threshold: f64,
}

impl PlaybackSync {
    pub fn new(drift_threshold: f64) -> Self {
        Self { drift_threshold }
    }

    pub fn drift_threshold(&self) -> f64 {
        self.drift_threshold
    }

    /// Commands needed to converge on the sender's timeline.
    ///
    /// `Load`, `Play`, `Pause` and `Seek` are applied unconditionally; a
    /// `StateSync` only corrects a non-host whose position is off by more
    /// than the drift threshold. `HostTransfer` carries no playback state.
    pub fn reconcile(
        &self,
        event: &WatchEvent,
        now_ms: u64,
        local_position: f64,
        is_host: bool,
    ) -> Vec<PlayerCommand> {
        let target = |time: f64, at: u64| time + latency_secs(now_ms, at);

        match event {
            WatchEvent::Load {
                source_type,
                url,
                at,
                time,
            } => vec![
                PlayerCommand::Load {
                    source_type: *source_type,
                    url: url.clone(),
                },
                PlayerCommand::Pause,
                PlayerCommand::Seek(target(time.unwrap_or(0.0), *at)),
            ],
            WatchEvent::Play { at, time } => {
                vec![PlayerCommand::Seek(target(*time, *at)), PlayerCommand::Play]
            }
            WatchEvent::Pause { at, time } => {
                vec![PlayerCommand::Seek(target(*time, *at)), PlayerCommand::Pause]
            }
            WatchEvent::Seek { at, time } => vec![PlayerCommand::Seek(target(*time, *at))],
            WatchEvent::StateSync { at, time } => {
                if is_host {
                    return Vec::new();
                }
                let target = target(*time, *at);
                if (local_position - target).abs() > self.drift_threshold {
                    vec![PlayerCommand::Seek(target)]
                } else {
                    Vec::new()
                }
            }
            WatchEvent::HostTransfer { .. } => Vec::new(),
        }
    }
}

impl Default for PlaybackSync {
    fn default() -> Self {
        Self::new(DRIFT_THRESHOLD_SECS)
    }
}
