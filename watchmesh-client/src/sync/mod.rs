mod media_player;
mod playback_sync;
mod virtual_player;

pub use media_player::MediaPlayer;
pub use playback_sync::{PlaybackSync, PlayerCommand, latency_secs};
pub use virtual_player::VirtualPlayer;

/// Drift (seconds) a non-host tolerates before a `state` update forces a seek.
pub const DRIFT_THRESHOLD_SECS: f64 = 0.5;

/// How often the host broadcasts its position (ms).
pub const SYNC_INTERVAL_MS: u64 = 2000;
