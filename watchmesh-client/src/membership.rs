use tracing::info;
use watchmesh_core::PeerId;

/// Who the local peer believes is host.
#[derive(Debug, Clone, PartialEq, Eq)]
struct HostState {
    self_id: PeerId,
    host: Option<PeerId>,
}

impl HostState {
    pub fn is_host(&self) -> bool {
        self.host.as_ref() == Some(&self.self_id)
    }
}

/// Room roster and host belief of the local peer.
#[derive(Debug, Clone)]
pub struct Membership {
    roster: Vec<PeerId>,
    host: HostState,
}

impl Membership {
    /// Build from the `peers` answer to a join. The first joiner of an empty
    /// room is host; anyone else assumes the oldest member is.
    pub fn from_roster(self_id: PeerId, peers: Vec<PeerId>) -> Self {
        let host = peers.first().cloned().unwrap_or_else(|| self_id.clone());
        let roster = peers.into_iter().filter(|p| *p != self_id).collect();
        Self {
            roster,
            host: HostState {
                self_id,
                host: Some(host),
            },
        }
    }

    /// Returns false for ids already present (or our own).
    pub fn on_peer_joined(&mut self, peer_id: PeerId) -> bool {
        if peer_id == self.host.self_id || self.roster.contains(&peer_id) {
            return false;
        }
        self.roster.push(peer_id);
        true
    }

    /// Returns true when the departed peer was the believed host, in which
    /// case the belief is cleared.
    pub fn on_peer_left(&mut self, peer_id: &PeerId) -> bool {
        self.roster.retain(|p| p != peer_id);
        if self.host.host.as_ref() == Some(peer_id) {
            info!("Host {:?} left the room", peer_id);
            self.host.host = None;
            return true;
        }
        false
    }

    /// Adopt a host announcement. Last write wins.
    pub fn apply_transfer(&mut self, host: PeerId) -> bool {
        if self.host.host.as_ref() == Some(&host) {
            return false;
        }
        info!("Host is now {:?}", host);
        self.host.host = Some(host);
        true
    }

    pub fn take_host(&mut self) -> bool {
        let self_id = self.host.self_id.clone();
        self.apply_transfer(self_id)
    }

    pub fn is_host(&self) -> bool {
        self.host.is_host()
    }

    pub fn host(&self) -> Option<&PeerId> {
        self.host.host.as_ref()
    }

    pub fn self_id(&self) -> &PeerId {
        &self.host.self_id
    }

    /// Other members in join order.
    pub fn roster(&self) -> &[PeerId] {
        &self.roster
    }

    /// Self first, then the roster.
    pub fn participants(&self) -> Vec<PeerId> {
        std::iter::once(self.host.self_id.clone())
            .chain(self.roster.iter().cloned())
            .collect()
    }
}
