use watchmesh_core::IceServerConfig;
use watchmesh_core::utils::default_stun_urls;
use webrtc::ice_transport::ice_server::RTCIceServer;

/// WebRTC configuration shared by every outbound connection.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub ice_servers: Vec<IceServerConfig>,
}

impl TransportConfig {
    pub fn new(ice_servers: Vec<IceServerConfig>) -> Self {
        Self { ice_servers }
    }

    pub(crate) fn rtc_ice_servers(&self) -> Vec<RTCIceServer> {
        self.ice_servers
            .iter()
            .map(|server| RTCIceServer {
                urls: server.urls.clone(),
                username: server.username.clone().unwrap_or_default(),
                credential: server.credential.clone().unwrap_or_default(),
            })
            .collect()
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec![IceServerConfig {
                urls: default_stun_urls(),
                username: None,
                credential: None,
            }],
        }
    }
}
