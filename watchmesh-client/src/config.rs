use serde::{Deserialize, Serialize};
use std::time::Duration;
use watchmesh_core::IceServerConfig;
use watchmesh_core::utils::default_stun_urls;

/// Tunables of a client session.
///
/// Every field has a default, so a partial TOML/JSON document is enough to
/// override a single value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Used until (or unless) the relay announces its own servers.
    pub ice_servers: Vec<IceServerConfig>,
    /// Seconds of drift tolerated before a `state` update forces a seek.
    pub drift_threshold_secs: f64,
    pub sync_interval_ms: u64,
    pub sweep_interval_ms: u64,
    pub negotiation_timeout_ms: u64,
    pub negotiation_retries: u32,
    pub chat_history_limit: usize,
}

impl SessionConfig {
    pub fn sync_interval(&self) -> Duration {
        Duration::from_millis(self.sync_interval_ms.max(1))
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms.max(1))
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec![IceServerConfig {
                urls: default_stun_urls(),
                username: None,
                credential: None,
            }],
            drift_threshold_secs: crate::sync::DRIFT_THRESHOLD_SECS,
            sync_interval_ms: crate::sync::SYNC_INTERVAL_MS,
            sweep_interval_ms: 1000,
            negotiation_timeout_ms: 15_000,
            negotiation_retries: 1,
            chat_history_limit: crate::chat::CHAT_HISTORY_LIMIT,
        }
    }
}
