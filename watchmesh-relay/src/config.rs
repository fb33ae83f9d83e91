use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use watchmesh_core::IceServerConfig;

/// Relay server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub bind: SocketAddr,
    /// Announced to every client right after `welcome`. Empty means clients
    /// use their own defaults.
    pub ice_servers: Vec<IceServerConfig>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 3001)),
            ice_servers: Vec::new(),
        }
    }
}
