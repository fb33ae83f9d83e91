use crate::room::RoomRegistry;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use watchmesh_core::{ClientMessage, IceServerConfig, PeerId, RelayMessage, RoomId};

struct PeerSlot {
    tx: mpsc::UnboundedSender<RelayMessage>,
    room: Option<RoomId>,
}

struct RelayInner {
    peers: DashMap<PeerId, PeerSlot>,
    rooms: RoomRegistry,
    ice_servers: Vec<IceServerConfig>,
}

/// Routes relay traffic between connected clients.
///
/// Each connection registers an outbox with [`RelayService::connect`]; the
/// WebSocket layer (or an in-process caller) then feeds decoded
/// [`ClientMessage`]s to [`RelayService::handle`].
#[derive(Clone)]
pub struct RelayService {
    inner: Arc<RelayInner>,
}

impl RelayService {
    pub fn new(ice_servers: Vec<IceServerConfig>) -> Self {
        Self {
            inner: Arc::new(RelayInner {
                peers: DashMap::new(),
                rooms: RoomRegistry::new(),
                ice_servers,
            }),
        }
    }

    /// Register a new connection and assign it a session id.
    pub fn connect(&self, tx: mpsc::UnboundedSender<RelayMessage>) -> PeerId {
        let peer_id = PeerId::new();

        let _ = tx.send(RelayMessage::Welcome {
            peer_id: peer_id.clone(),
        });
        if !self.inner.ice_servers.is_empty() {
            let _ = tx.send(RelayMessage::IceConfig {
                ice_servers: self.inner.ice_servers.clone(),
            });
        }

        self.inner
            .peers
            .insert(peer_id.clone(), PeerSlot { tx, room: None });
        info!("Peer {:?} connected", peer_id);
        peer_id
    }

    pub fn handle(&self, peer_id: &PeerId, msg: ClientMessage) {
        match msg {
            ClientMessage::Join { room } => self.join(peer_id, room),
            ClientMessage::Signal { to, data } => {
                debug!("Relaying {} from {:?} to {:?}", data.label(), peer_id, to);
                self.send(
                    &to,
                    RelayMessage::Signal {
                        from: peer_id.clone(),
                        data,
                    },
                );
            }
            ClientMessage::Broadcast { payload } => self.broadcast(peer_id, payload),
        }
    }

    /// Drop a connection and tell its room.
    pub fn disconnect(&self, peer_id: &PeerId) {
        let Some((_, slot)) = self.inner.peers.remove(peer_id) else {
            return;
        };
        if let Some(room) = slot.room {
            self.leave_room(&room, peer_id);
        }
        info!("Peer {:?} disconnected", peer_id);
    }

    pub fn send(&self, peer_id: &PeerId, msg: RelayMessage) {
        if let Some(peer) = self.inner.peers.get(peer_id) {
            if peer.tx.send(msg).is_err() {
                warn!("Outbox of {:?} is closed", peer_id);
            }
        } else {
            warn!("Attempted to relay to disconnected peer {:?}", peer_id);
        }
    }

    pub fn members(&self, room: &RoomId) -> Vec<PeerId> {
        self.inner.rooms.members(room)
    }

    pub fn peer_count(&self) -> usize {
        self.inner.peers.len()
    }

    fn join(&self, peer_id: &PeerId, room: RoomId) {
        let previous = {
            let Some(mut slot) = self.inner.peers.get_mut(peer_id) else {
                warn!("Join from unknown peer {:?}", peer_id);
                return;
            };
            slot.room.replace(room.clone())
        };

        if let Some(previous) = previous {
            self.leave_room(&previous, peer_id);
        }

        info!("Peer {:?} joins room '{}'", peer_id, room);
        self.inner.rooms.join(&room, peer_id, |others| {
            self.send(
                peer_id,
                RelayMessage::Peers {
                    peers: others.to_vec(),
                },
            );
            for other in others {
                self.send(
                    other,
                    RelayMessage::PeerJoined {
                        peer_id: peer_id.clone(),
                    },
                );
            }
        });
    }

    fn leave_room(&self, room: &RoomId, peer_id: &PeerId) {
        self.inner.rooms.leave(room, peer_id, |remaining| {
            for other in remaining {
                self.send(
                    other,
                    RelayMessage::PeerLeft {
                        peer_id: peer_id.clone(),
                    },
                );
            }
        });
    }

    fn broadcast(&self, peer_id: &PeerId, payload: serde_json::Value) {
        let room = self
            .inner
            .peers
            .get(peer_id)
            .and_then(|slot| slot.room.clone());
        let Some(room) = room else {
            warn!("Broadcast from {:?} outside of any room", peer_id);
            return;
        };

        for other in self.inner.rooms.members(&room) {
            if &other == peer_id {
                continue;
            }
            self.send(
                &other,
                RelayMessage::Broadcast {
                    from: peer_id.clone(),
                    payload: payload.clone(),
                },
            );
        }
    }
}

impl Default for RelayService {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}
