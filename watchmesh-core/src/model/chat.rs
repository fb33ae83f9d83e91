use crate::model::peer::PeerId;
use crate::model::watch::WatchEvent;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub from: PeerId,
    pub text: String,
    /// Epoch milliseconds.
    pub ts: u64,
}

/// Application payload carried by a relay `broadcast`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BroadcastPayload {
    Chat {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ts: Option<u64>,
    },
    Watch(WatchEvent),
}
