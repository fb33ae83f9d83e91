use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::peer::peer_state::{InvalidTransition, PeerState};
use crate::relay::RelayChannel;
use crate::transport::{
    EventSink, LinkEvent, LinkState, LocalMedia, LocalTrack, PeerConnector, PeerLink,
    RemoteStream, Role, TrackKind, TransportEvent,
};
use anyhow::Context;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use watchmesh_core::{ClientMessage, IceCandidate, IceServerConfig, PeerId, SignalPayload};

/// What the session needs to hear about after the manager handled an input.
#[derive(Debug, Clone)]
pub enum ManagerEvent {
    Connected(PeerId),
    /// The peer is gone from every table. Emitted once per teardown.
    Removed(PeerId),
    ChannelOpened(PeerId),
    ChannelClosed(PeerId),
    StreamUpdated(PeerId, RemoteStream),
    Message(PeerId, String),
}

struct PeerEntry {
    link: Arc<dyn PeerLink>,
    link_id: u64,
    state: PeerState,
    role: Role,
    stream: RemoteStream,
    channel_open: bool,
    remote_described: bool,
    pending_candidates: Vec<IceCandidate>,
    negotiating_since: u64,
    retries: u32,
}

impl PeerEntry {
    fn new(link: Arc<dyn PeerLink>, link_id: u64, role: Role, now_ms: u64, retries: u32) -> Self {
        Self {
            link,
            link_id,
            state: PeerState::Idle,
            role,
            stream: RemoteStream::default(),
            channel_open: false,
            remote_described: false,
            pending_candidates: Vec::new(),
            negotiating_since: now_ms,
            retries,
        }
    }

    /// Apply `step`, or log and keep the current state if it is not allowed.
    fn transition(
        &mut self,
        peer_id: &PeerId,
        step: fn(PeerState) -> Result<PeerState, InvalidTransition>,
    ) -> bool {
        match step(self.state) {
            Ok(next) => {
                if next != self.state {
                    debug!("Peer {:?}: {:?} -> {:?}", peer_id, self.state, next);
                }
                self.state = next;
                true
            }
            Err(e) => {
                warn!("Peer {:?}: {}", peer_id, e);
                false
            }
        }
    }
}

/// Owns one connection per remote peer and drives the offer/answer/candidate
/// handshake over the relay.
///
/// All methods are called from the session loop; nothing here is shared.
pub struct PeerConnectionManager {
    connector: Box<dyn PeerConnector>,
    relay: Arc<dyn RelayChannel>,
    events_tx: mpsc::Sender<LinkEvent>,
    media: LocalMedia,
    /// Kinds whose outbound sender currently transmits nothing.
    muted: HashSet<TrackKind>,
    peers: HashMap<PeerId, PeerEntry>,
    next_link_id: u64,
    negotiation_timeout_ms: u64,
    max_retries: u32,
}

impl PeerConnectionManager {
    pub fn new(
        connector: Box<dyn PeerConnector>,
        relay: Arc<dyn RelayChannel>,
        events_tx: mpsc::Sender<LinkEvent>,
        config: &SessionConfig,
    ) -> Self {
        Self {
            connector,
            relay,
            events_tx,
            media: LocalMedia::default(),
            muted: HashSet::new(),
            peers: HashMap::new(),
            next_link_id: 1,
            negotiation_timeout_ms: config.negotiation_timeout_ms,
            max_retries: config.negotiation_retries,
        }
    }

    /// Tracks attached to connections created from now on.
    pub fn set_local_media(&mut self, media: LocalMedia) {
        self.media = media;
    }

    /// Swap the local track of `track`'s kind on every open connection and
    /// for connections created later. A muted kind stays muted; the new
    /// track goes out once it is unmuted. Returns how many links took it.
    pub async fn replace_local_track(&mut self, track: LocalTrack) -> usize {
        let kind = TrackKind::from(track.kind());
        info!("Replacing local {:?} track with {:?}", kind, track.id());
        self.media.replace(track.clone());

        if self.muted.contains(&kind) {
            debug!("Local {:?} is muted, new track goes out on unmute", kind);
            return 0;
        }
        self.replace_on_links(kind, Some(track)).await
    }

    /// Mute or unmute the outbound `kind` sender on every connection.
    /// Returns how many links were updated.
    pub async fn set_track_enabled(&mut self, kind: TrackKind, enabled: bool) -> usize {
        let changed = if enabled {
            self.muted.remove(&kind)
        } else {
            self.muted.insert(kind)
        };
        if !changed {
            debug!("Local {:?} already {}", kind, if enabled { "on" } else { "off" });
            return 0;
        }

        info!("Local {:?} {}", kind, if enabled { "unmuted" } else { "muted" });
        let outbound = if enabled {
            self.media.track(kind).cloned()
        } else {
            None
        };
        self.replace_on_links(kind, outbound).await
    }

    /// Kinds currently muted, audio first.
    pub fn muted_tracks(&self) -> Vec<TrackKind> {
        [TrackKind::Audio, TrackKind::Video]
            .into_iter()
            .filter(|k| self.muted.contains(k))
            .collect()
    }

    async fn replace_on_links(&self, kind: TrackKind, track: Option<LocalTrack>) -> usize {
        let mut replaced = 0;
        for (peer_id, entry) in &self.peers {
            match entry.link.replace_track(kind, track.clone()).await {
                Ok(true) => replaced += 1,
                Ok(false) => debug!("No {:?} sender towards {:?}", kind, peer_id),
                Err(e) => warn!("Track swap for {:?} failed: {:#}", peer_id, e),
            }
        }
        replaced
    }

    /// Open a link and apply current mutes to it.
    async fn open_link(
        &mut self,
        peer_id: &PeerId,
        role: Role,
    ) -> anyhow::Result<(Arc<dyn PeerLink>, u64)> {
        let link_id = self.next_link_id;
        self.next_link_id += 1;

        let sink = EventSink::new(link_id, self.events_tx.clone());
        let link = self
            .connector
            .connect(peer_id.clone(), role, &self.media, sink)
            .await?;

        for kind in &self.muted {
            if let Err(e) = link.replace_track(*kind, None).await {
                warn!("Could not mute {:?} towards {:?}: {:#}", kind, peer_id, e);
            }
        }
        Ok((link, link_id))
    }

    pub fn update_ice_servers(&mut self, ice_servers: Vec<IceServerConfig>) {
        self.connector.update_ice_servers(ice_servers);
    }

    /// Open a connection to `peer_id` as the initiator and send the offer.
    pub async fn initiate(&mut self, peer_id: PeerId, now_ms: u64) -> Result<(), SessionError> {
        if self.peers.contains_key(&peer_id) {
            debug!("Connection to {:?} already exists", peer_id);
            return Ok(());
        }
        self.start_offer(peer_id, now_ms, 0).await
    }

    async fn start_offer(
        &mut self,
        peer_id: PeerId,
        now_ms: u64,
        retries: u32,
    ) -> Result<(), SessionError> {
        let (link, link_id) = self.open_link(&peer_id, Role::Initiator).await?;

        let mut entry = PeerEntry::new(link.clone(), link_id, Role::Initiator, now_ms, retries);
        entry.transition(&peer_id, PeerState::begin_negotiation);
        self.peers.insert(peer_id.clone(), entry);

        let sdp = match link.create_offer().await {
            Ok(sdp) => sdp,
            Err(e) => {
                self.discard(&peer_id).await;
                return Err(e.into());
            }
        };

        info!("Sending offer to {:?}", peer_id);
        self.relay
            .send(ClientMessage::Signal {
                to: peer_id,
                data: SignalPayload::Offer { sdp },
            })
            .await
    }

    /// Apply a handshake envelope. Unknown senders get a responder
    /// connection on their first envelope, whatever its kind.
    ///
    /// Only a connection that cannot apply its first description is torn
    /// down. Stale or duplicate descriptions for an existing connection are
    /// dropped.
    pub async fn handle_signal(
        &mut self,
        from: PeerId,
        data: SignalPayload,
        now_ms: u64,
    ) -> Option<ManagerEvent> {
        debug!("Received {} from {:?}", data.label(), from);

        let result = match data {
            SignalPayload::Offer { sdp } => self.on_offer(&from, sdp, now_ms).await,
            SignalPayload::Answer { sdp } => self.on_answer(&from, sdp, now_ms).await,
            SignalPayload::Candidate(candidate) => {
                self.on_candidate(&from, candidate, now_ms).await
            }
        };

        match result {
            Ok(()) => None,
            Err(e) => {
                warn!("Negotiation with {:?} failed: {:#}", from, e);
                self.fail(&from).await
            }
        }
    }

    async fn on_offer(&mut self, from: &PeerId, sdp: String, now_ms: u64) -> anyhow::Result<()> {
        // a second offer on a described connection restarts negotiation
        if self.peers.get(from).is_some_and(|e| e.remote_described) {
            info!("{:?} restarted negotiation", from);
            self.discard(from).await;
        }

        self.ensure_responder(from, now_ms).await?;
        let answer = self.link(from)?.accept_offer(sdp).await?;
        self.mark_described(from).await;

        info!("Sending answer to {:?}", from);
        self.relay
            .send(ClientMessage::Signal {
                to: from.clone(),
                data: SignalPayload::Answer { sdp: answer },
            })
            .await?;
        Ok(())
    }

    async fn on_answer(&mut self, from: &PeerId, sdp: String, now_ms: u64) -> anyhow::Result<()> {
        if !self.peers.contains_key(from) {
            self.ensure_responder(from, now_ms).await?;
            self.link(from)?.accept_answer(sdp).await?;
            self.mark_described(from).await;
            return Ok(());
        }

        let entry = self
            .peers
            .get(from)
            .with_context(|| format!("No connection for {:?}", from))?;
        if entry.role != Role::Initiator
            || entry.remote_described
            || entry.state != PeerState::Negotiating
        {
            debug!(
                "Dropping answer from {:?}: {:?} link is {:?}, described: {}",
                from, entry.role, entry.state, entry.remote_described
            );
            return Ok(());
        }

        // may answer an offer this link never made
        let link = entry.link.clone();
        if let Err(e) = link.accept_answer(sdp).await {
            warn!("Dropping answer from {:?} that does not fit: {:#}", from, e);
            return Ok(());
        }
        self.mark_described(from).await;
        Ok(())
    }

    async fn on_candidate(
        &mut self,
        from: &PeerId,
        candidate: IceCandidate,
        now_ms: u64,
    ) -> anyhow::Result<()> {
        self.ensure_responder(from, now_ms).await?;

        let entry = self
            .peers
            .get_mut(from)
            .with_context(|| format!("No connection for {:?}", from))?;
        if !entry.remote_described {
            debug!("Queueing early candidate from {:?}", from);
            entry.pending_candidates.push(candidate);
            return Ok(());
        }

        let link = entry.link.clone();
        if let Err(e) = link.add_ice_candidate(candidate).await {
            warn!("Failed to add ICE candidate for {:?}: {:?}", from, e);
        }
        Ok(())
    }

    async fn ensure_responder(&mut self, peer_id: &PeerId, now_ms: u64) -> anyhow::Result<()> {
        if self.peers.contains_key(peer_id) {
            return Ok(());
        }

        info!("Creating responder connection for {:?}", peer_id);
        let (link, link_id) = self.open_link(peer_id, Role::Responder).await?;

        let mut entry = PeerEntry::new(link, link_id, Role::Responder, now_ms, 0);
        entry.transition(peer_id, PeerState::begin_negotiation);
        self.peers.insert(peer_id.clone(), entry);
        Ok(())
    }

    fn link(&self, peer_id: &PeerId) -> anyhow::Result<Arc<dyn PeerLink>> {
        self.peers
            .get(peer_id)
            .map(|e| e.link.clone())
            .with_context(|| format!("No connection for {:?}", peer_id))
    }

    /// Record that the remote description is set and flush queued candidates.
    async fn mark_described(&mut self, peer_id: &PeerId) {
        let Some(entry) = self.peers.get_mut(peer_id) else {
            return;
        };
        entry.remote_described = true;
        let pending = std::mem::take(&mut entry.pending_candidates);
        let link = entry.link.clone();

        if !pending.is_empty() {
            debug!("Applying {} queued candidate(s) for {:?}", pending.len(), peer_id);
        }
        for candidate in pending {
            if let Err(e) = link.add_ice_candidate(candidate).await {
                warn!("Failed to add ICE candidate for {:?}: {:?}", peer_id, e);
            }
        }
    }

    /// Apply a link report. Reports from a link that has since been
    /// replaced or closed are ignored.
    pub async fn handle_transport_event(&mut self, event: LinkEvent) -> Option<ManagerEvent> {
        let LinkEvent { link_id, event } = event;
        let peer_id = event.peer_id().clone();
        let Some(entry) = self.peers.get_mut(&peer_id) else {
            debug!("Ignoring transport event for unknown peer {:?}", peer_id);
            return None;
        };
        if entry.link_id != link_id {
            debug!(
                "Ignoring event from replaced link {} to {:?} (current {})",
                link_id, peer_id, entry.link_id
            );
            return None;
        }

        match event {
            TransportEvent::CandidateGenerated(_, candidate) => {
                let msg = ClientMessage::Signal {
                    to: peer_id.clone(),
                    data: SignalPayload::Candidate(candidate),
                };
                if let Err(e) = self.relay.send(msg).await {
                    warn!("Failed to send candidate to {:?}: {}", peer_id, e);
                }
                None
            }

            TransportEvent::StateChanged(_, state) => match state {
                LinkState::Connected => {
                    let was_connected = entry.state == PeerState::Connected;
                    if entry.transition(&peer_id, PeerState::connect) && !was_connected {
                        info!("Connected to {:?}", peer_id);
                        Some(ManagerEvent::Connected(peer_id))
                    } else {
                        None
                    }
                }
                LinkState::Failed | LinkState::Closed => {
                    info!("Transport to {:?} is {:?}", peer_id, state);
                    self.fail(&peer_id).await
                }
                LinkState::Disconnected => {
                    info!("Transport to {:?} disconnected, waiting for recovery", peer_id);
                    None
                }
                LinkState::New | LinkState::Connecting => None,
            },

            TransportEvent::DataChannelOpen(_) => {
                entry.channel_open = true;
                Some(ManagerEvent::ChannelOpened(peer_id))
            }

            TransportEvent::DataChannelClosed(_) => {
                if std::mem::replace(&mut entry.channel_open, false) {
                    Some(ManagerEvent::ChannelClosed(peer_id))
                } else {
                    None
                }
            }

            TransportEvent::Message(_, text) => Some(ManagerEvent::Message(peer_id, text)),

            TransportEvent::TrackAdded(_, track) => {
                entry.stream.add(track);
                let stream = entry.stream.clone();
                Some(ManagerEvent::StreamUpdated(peer_id, stream))
            }
        }
    }

    /// Tear down connections that stayed in `Negotiating` past the timeout.
    /// Initiators get a fresh offer while they have retries left.
    pub async fn sweep_stalled(&mut self, now_ms: u64) -> Vec<ManagerEvent> {
        let timeout = self.negotiation_timeout_ms;
        let stalled: Vec<(PeerId, Role, u32)> = self
            .peers
            .iter()
            .filter(|(_, e)| {
                e.state == PeerState::Negotiating
                    && now_ms.saturating_sub(e.negotiating_since) >= timeout
            })
            .map(|(id, e)| (id.clone(), e.role, e.retries))
            .collect();

        let mut events = Vec::new();
        for (peer_id, role, retries) in stalled {
            if role == Role::Initiator && retries < self.max_retries {
                warn!(
                    "Negotiation with {:?} stalled, re-offering ({}/{})",
                    peer_id,
                    retries + 1,
                    self.max_retries
                );
                self.discard(&peer_id).await;
                if let Err(e) = self.start_offer(peer_id.clone(), now_ms, retries + 1).await {
                    warn!("Re-offer to {:?} failed: {}", peer_id, e);
                    self.discard(&peer_id).await;
                    events.push(ManagerEvent::Removed(peer_id));
                }
            } else {
                warn!("Negotiation with {:?} timed out", peer_id);
                events.extend(self.fail(&peer_id).await);
            }
        }
        events
    }

    async fn fail(&mut self, peer_id: &PeerId) -> Option<ManagerEvent> {
        let entry = self.peers.get_mut(peer_id)?;
        entry.transition(peer_id, PeerState::fail);
        self.discard(peer_id).await;
        Some(ManagerEvent::Removed(peer_id.clone()))
    }

    /// Close and forget the connection to `peer_id`. Returns false if there
    /// was none.
    pub async fn remove(&mut self, peer_id: &PeerId) -> bool {
        self.discard(peer_id).await
    }

    async fn discard(&mut self, peer_id: &PeerId) -> bool {
        let Some(mut entry) = self.peers.remove(peer_id) else {
            return false;
        };
        entry.transition(peer_id, PeerState::close);
        if let Err(e) = entry.link.close().await {
            warn!("Error closing connection to {:?}: {:?}", peer_id, e);
        }
        info!("Removed peer {:?}", peer_id);
        true
    }

    pub async fn close_all(&mut self) {
        let ids: Vec<PeerId> = self.peers.keys().cloned().collect();
        for peer_id in ids {
            self.discard(&peer_id).await;
        }
    }

    /// Send `text` over every open chat channel; returns how many accepted it.
    pub async fn send_text_all(&self, text: &str) -> usize {
        let mut delivered = 0;
        for (peer_id, entry) in self.peers.iter().filter(|(_, e)| e.channel_open) {
            match entry.link.send_text(text).await {
                Ok(()) => delivered += 1,
                Err(e) => warn!("Chat send to {:?} failed: {:?}", peer_id, e),
            }
        }
        delivered
    }

    pub fn state(&self, peer_id: &PeerId) -> Option<PeerState> {
        self.peers.get(peer_id).map(|e| e.state)
    }

    /// Every known peer with its state, ordered by id.
    pub fn states(&self) -> Vec<(PeerId, PeerState)> {
        let mut states: Vec<_> = self
            .peers
            .iter()
            .map(|(id, e)| (id.clone(), e.state))
            .collect();
        states.sort_by(|a, b| a.0.cmp(&b.0));
        states
    }

    pub fn open_channel_count(&self) -> usize {
        self.peers.values().filter(|e| e.channel_open).count()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}
