use anyhow::{Context, Result, bail, ensure};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::Mutex;
use watchmesh_client::{
    EventSink, LinkState, LocalMedia, LocalTrack, PeerConnector, PeerLink, RemoteTrack, Role,
    TrackKind, TransportEvent,
};
use watchmesh_core::{IceCandidate, PeerId};

pub const OFFER_PREFIX: &str = "mock-offer:";
pub const ANSWER_PREFIX: &str = "mock-answer:";

/// Offer SDP that no mock link created; accepting it succeeds but never
/// connects.
pub const EXTERNAL_OFFER: &str = "mock-offer:external";

struct NetworkState {
    next_offer: u64,
    open_offers: HashMap<u64, Arc<Endpoint>>,
    offers_to: HashMap<PeerId, usize>,
    candidates_applied: usize,
    early_candidates: usize,
    track_swaps: Vec<TrackSwap>,
    stalled: bool,
    data_channels: bool,
}

impl Default for NetworkState {
    fn default() -> Self {
        Self {
            next_offer: 1,
            open_offers: HashMap::new(),
            offers_to: HashMap::new(),
            candidates_applied: 0,
            early_candidates: 0,
            track_swaps: Vec::new(),
            stalled: false,
            data_channels: true,
        }
    }
}

/// A `replace_track` call that hit an outbound sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackSwap {
    /// Remote end of the link whose sender changed.
    pub to: PeerId,
    pub kind: TrackKind,
    /// Id of the new track; `None` when muted.
    pub track: Option<String>,
}

/// One side of an in-memory connection.
struct Endpoint {
    /// The peer this side is connected to, as its owner knows it.
    remote: PeerId,
    events: EventSink,
    tracks: Vec<RemoteTrack>,
    closed: AtomicBool,
    described: AtomicBool,
    /// Id of the offer this side created, 0 if none.
    offer: AtomicU64,
    partner: Mutex<Option<Arc<Endpoint>>>,
}

impl Endpoint {
    async fn emit(&self, build: impl FnOnce(PeerId) -> TransportEvent) {
        if self.closed.load(Ordering::SeqCst) {
            return;
        }
        self.events.send(build(self.remote.clone())).await;
    }
}

/// Loopback transport: links created by different sessions pair up through
/// the SDP strings they exchange over the relay.
#[derive(Clone, Default)]
pub struct MockNetwork {
    state: Arc<Mutex<NetworkState>>,
}

impl MockNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connector(&self) -> Box<dyn PeerConnector> {
        Box::new(MockConnector {
            network: self.clone(),
        })
    }

    /// While stalled, answers are accepted but connections never come up.
    pub async fn set_stalled(&self, stalled: bool) {
        self.state.lock().await.stalled = stalled;
    }

    pub async fn set_data_channels(&self, enabled: bool) {
        self.state.lock().await.data_channels = enabled;
    }

    /// Offers created for `peer_id` by anyone.
    pub async fn offers_to(&self, peer_id: &PeerId) -> usize {
        self.state
            .lock()
            .await
            .offers_to
            .get(peer_id)
            .copied()
            .unwrap_or(0)
    }

    pub async fn candidates_applied(&self) -> usize {
        self.state.lock().await.candidates_applied
    }

    /// Candidates handed to a link before its remote description was set.
    pub async fn early_candidates(&self) -> usize {
        self.state.lock().await.early_candidates
    }

    /// Every sender swap so far, in call order.
    pub async fn track_swaps(&self) -> Vec<TrackSwap> {
        self.state.lock().await.track_swaps.clone()
    }

    async fn register_offer(&self, endpoint: Arc<Endpoint>) -> u64 {
        let mut state = self.state.lock().await;
        let id = state.next_offer;
        state.next_offer += 1;
        *state.offers_to.entry(endpoint.remote.clone()).or_default() += 1;
        state.open_offers.insert(id, endpoint);
        id
    }

    async fn take_offer(&self, id: u64) -> Option<Arc<Endpoint>> {
        self.state.lock().await.open_offers.remove(&id)
    }

    async fn establish(&self, initiator: &Arc<Endpoint>, responder: &Arc<Endpoint>) {
        let data_channels = self.state.lock().await.data_channels;

        for (side, other) in [(initiator, responder), (responder, initiator)] {
            side.emit(|p| TransportEvent::StateChanged(p, LinkState::Connecting))
                .await;
            side.emit(|p| TransportEvent::StateChanged(p, LinkState::Connected))
                .await;
            for track in &other.tracks {
                let track = track.clone();
                side.emit(|p| TransportEvent::TrackAdded(p, track)).await;
            }
        }
        if data_channels {
            initiator.emit(TransportEvent::DataChannelOpen).await;
            responder.emit(TransportEvent::DataChannelOpen).await;
        }
    }
}

struct MockConnector {
    network: MockNetwork,
}

#[async_trait]
impl PeerConnector for MockConnector {
    async fn connect(
        &self,
        peer_id: PeerId,
        _role: Role,
        media: &LocalMedia,
        events: EventSink,
    ) -> Result<Arc<dyn PeerLink>> {
        let tracks = media
            .tracks()
            .iter()
            .map(|t| RemoteTrack::new(t.id(), t.stream_id(), TrackKind::from(t.kind())))
            .collect();

        Ok(Arc::new(MockLink {
            endpoint: Arc::new(Endpoint {
                remote: peer_id,
                events,
                tracks,
                closed: AtomicBool::new(false),
                described: AtomicBool::new(false),
                offer: AtomicU64::new(0),
                partner: Mutex::new(None),
            }),
            network: self.network.clone(),
        }))
    }
}

struct MockLink {
    endpoint: Arc<Endpoint>,
    network: MockNetwork,
}

#[async_trait]
impl PeerLink for MockLink {
    async fn create_offer(&self) -> Result<String> {
        let id = self.network.register_offer(self.endpoint.clone()).await;
        self.endpoint.offer.store(id, Ordering::SeqCst);
        let candidate = IceCandidate {
            candidate: format!("candidate:{} 1 udp 2122260223 10.0.0.1 {} typ host", id, 50000 + id),
            sdp_mid: Some("0".into()),
            sdp_m_line_index: Some(0),
        };
        self.endpoint
            .emit(|p| TransportEvent::CandidateGenerated(p, candidate))
            .await;
        Ok(format!("{}{}", OFFER_PREFIX, id))
    }

    async fn accept_offer(&self, sdp: String) -> Result<String> {
        let token = sdp
            .strip_prefix(OFFER_PREFIX)
            .context("Not a mock offer")?
            .to_owned();
        self.endpoint.described.store(true, Ordering::SeqCst);

        if let Ok(id) = token.parse::<u64>() {
            let initiator = self
                .network
                .take_offer(id)
                .await
                .with_context(|| format!("Unknown offer {}", id))?;
            *initiator.partner.lock().await = Some(self.endpoint.clone());
            *self.endpoint.partner.lock().await = Some(initiator);
        }
        Ok(format!("{}{}", ANSWER_PREFIX, token))
    }

    async fn accept_answer(&self, sdp: String) -> Result<()> {
        let token = sdp.strip_prefix(ANSWER_PREFIX).context("Not a mock answer")?;
        ensure!(
            !self.endpoint.described.load(Ordering::SeqCst),
            "Answer in stable state"
        );
        let offer = self.endpoint.offer.load(Ordering::SeqCst);
        if let Ok(id) = token.parse::<u64>() {
            ensure!(id == offer, "Answer to offer {} but {} is pending", id, offer);
        }
        self.endpoint.described.store(true, Ordering::SeqCst);

        if self.network.state.lock().await.stalled {
            return Ok(());
        }
        let partner = self.endpoint.partner.lock().await.clone();
        if let Some(partner) = partner {
            self.network.establish(&self.endpoint, &partner).await;
        }
        Ok(())
    }

    async fn add_ice_candidate(&self, _candidate: IceCandidate) -> Result<()> {
        let mut state = self.network.state.lock().await;
        if !self.endpoint.described.load(Ordering::SeqCst) {
            state.early_candidates += 1;
            bail!("Remote description not set");
        }
        state.candidates_applied += 1;
        Ok(())
    }

    async fn replace_track(&self, kind: TrackKind, track: Option<LocalTrack>) -> Result<bool> {
        if !self.endpoint.tracks.iter().any(|t| t.kind == kind) {
            return Ok(false);
        }
        self.network.state.lock().await.track_swaps.push(TrackSwap {
            to: self.endpoint.remote.clone(),
            kind,
            track: track.map(|t| t.id().to_owned()),
        });
        Ok(true)
    }

    async fn send_text(&self, text: &str) -> Result<()> {
        let partner = self
            .endpoint
            .partner
            .lock()
            .await
            .clone()
            .context("Not connected")?;
        let text = text.to_owned();
        partner.emit(|p| TransportEvent::Message(p, text)).await;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.endpoint.closed.store(true, Ordering::SeqCst);
        self.endpoint.partner.lock().await.take();
        Ok(())
    }
}
