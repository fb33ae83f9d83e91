use crate::model::peer::PeerId;
use crate::model::room::RoomId;
use crate::model::signaling::{IceServerConfig, SignalPayload};
use serde::{Deserialize, Serialize};

/// Frames a client sends to the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "d", rename_all = "kebab-case")]
pub enum ClientMessage {
    Join {
        room: RoomId,
    },
    Signal {
        to: PeerId,
        data: SignalPayload,
    },
    /// Fan-out to every other member of the sender's room. The relay does not
    /// inspect the payload.
    Broadcast {
        payload: serde_json::Value,
    },
}

/// Frames the relay sends to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "d", rename_all = "kebab-case")]
pub enum RelayMessage {
    Welcome {
        peer_id: PeerId,
    },
    IceConfig {
        ice_servers: Vec<IceServerConfig>,
    },
    /// Roster of the joined room, excluding the receiver.
    Peers {
        peers: Vec<PeerId>,
    },
    PeerJoined {
        peer_id: PeerId,
    },
    PeerLeft {
        peer_id: PeerId,
    },
    Signal {
        from: PeerId,
        data: SignalPayload,
    },
    Broadcast {
        from: PeerId,
        payload: serde_json::Value,
    },
}
