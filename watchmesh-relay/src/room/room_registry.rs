use dashmap::DashMap;
use tracing::{debug, info};
use watchmesh_core::{PeerId, RoomId};

/// Room membership kept by the relay.
///
/// Rooms are created on first join and forgotten when the last member leaves.
/// Callbacks passed to [`RoomRegistry::join`] and [`RoomRegistry::leave`] run
/// while the room entry is locked, so notifications for one room are emitted
/// in the same order the membership changes are applied.
#[derive(Default)]
pub struct RoomRegistry {
    rooms: DashMap<RoomId, Vec<PeerId>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `peer_id` to `room`. `notify` receives the members that were already
    /// present, in join order.
    pub fn join<F>(&self, room: &RoomId, peer_id: &PeerId, notify: F)
    where
        F: FnOnce(&[PeerId]),
    {
        let mut members = self.rooms.entry(room.clone()).or_insert_with(|| {
            info!("Creating room '{}'", room);
            Vec::new()
        });

        members.retain(|p| p != peer_id);
        notify(members.as_slice());
        members.push(peer_id.clone());

        debug!("Room '{}' now has {} member(s)", room, members.len());
    }

    /// Remove `peer_id` from `room`. `notify` receives the remaining members;
    /// it is not called when the peer was not a member.
    pub fn leave<F>(&self, room: &RoomId, peer_id: &PeerId, notify: F)
    where
        F: FnOnce(&[PeerId]),
    {
        let now_empty = {
            let Some(mut members) = self.rooms.get_mut(room) else {
                return;
            };
            let before = members.len();
            members.retain(|p| p != peer_id);
            if members.len() == before {
                return;
            }
            notify(members.as_slice());
            members.is_empty()
        };

        if now_empty {
            let removed = self.rooms.remove_if(room, |_, members| members.is_empty());
            if removed.is_some() {
                info!("Room '{}' is empty, dropping it", room);
            }
        }
    }

    pub fn members(&self, room: &RoomId) -> Vec<PeerId> {
        self.rooms
            .get(room)
            .map(|m| m.value().clone())
            .unwrap_or_default()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}
