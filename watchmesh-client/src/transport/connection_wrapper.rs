use crate::transport::media::{LocalMedia, LocalTrack, RemoteTrack, TrackKind};
use crate::transport::peer_link::{PeerConnector, PeerLink, Role};
use crate::transport::transport_config::TransportConfig;
use crate::transport::transport_event::{EventSink, LinkState, TransportEvent};
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use watchmesh_core::{IceCandidate, IceServerConfig, PeerId};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::data_channel::RTCDataChannel;
use webrtc::data_channel::data_channel_message::DataChannelMessage;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use webrtc::rtp_transceiver::rtp_sender::RTCRtpSender;
use webrtc::rtp_transceiver::RTCRtpTransceiver;
use webrtc::track::track_remote::TrackRemote;

pub const CHAT_CHANNEL_LABEL: &str = "chat";

type ChannelSlot = Arc<Mutex<Option<Arc<RTCDataChannel>>>>;

/// Forwards callback output into the session's transport channel until the
/// link is closed locally.
#[derive(Clone)]
struct Emitter {
    peer_id: PeerId,
    sink: EventSink,
    muted: Arc<AtomicBool>,
}

impl Emitter {
    async fn emit(&self, build: impl FnOnce(PeerId) -> TransportEvent) {
        if self.muted.load(Ordering::Acquire) {
            return;
        }
        self.sink.send(build(self.peer_id.clone())).await;
    }
}

/// A webrtc-rs peer connection plus its `"chat"` data channel.
pub struct ConnectionWrapper {
    pub peer_id: PeerId,
    pub peer_connection: Arc<RTCPeerConnection>,
    channel: ChannelSlot,
    /// Outbound senders, one per attached local track.
    senders: Mutex<Vec<(TrackKind, Arc<RTCRtpSender>)>>,
    muted: Arc<AtomicBool>,
}

impl ConnectionWrapper {
    /// Create the connection, attach `media` and wire every callback to
    /// `events`. An initiator also opens the chat channel here, so it is
    /// part of the first offer.
    pub async fn new(
        peer_id: PeerId,
        role: Role,
        config: TransportConfig,
        media: &LocalMedia,
        events: EventSink,
    ) -> Result<Self> {
        let mut m = MediaEngine::default();
        m.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut m)?;

        let api = APIBuilder::new()
            .with_media_engine(m)
            .with_interceptor_registry(registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: config.rtc_ice_servers(),
            ..Default::default()
        };

        let peer_connection = Arc::new(
            api.new_peer_connection(rtc_config)
                .await
                .context("Failed to create peer connection")?,
        );

        let muted = Arc::new(AtomicBool::new(false));
        let channel: ChannelSlot = Arc::new(Mutex::new(None));
        let emitter = Emitter {
            peer_id: peer_id.clone(),
            sink: events,
            muted: muted.clone(),
        };

        let state_em = emitter.clone();
        peer_connection.on_peer_connection_state_change(Box::new(
            move |s: RTCPeerConnectionState| {
                let em = state_em.clone();
                Box::pin(async move {
                    info!("Peer connection state for {:?}: {:?}", em.peer_id, s);
                    em.emit(|p| TransportEvent::StateChanged(p, LinkState::from(s)))
                        .await;
                })
            },
        ));

        let ice_em = emitter.clone();
        peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let em = ice_em.clone();
            Box::pin(async move {
                let Some(candidate) = c else { return };
                let Ok(init) = candidate.to_json() else {
                    return;
                };
                let candidate = IceCandidate {
                    candidate: init.candidate,
                    sdp_mid: init.sdp_mid,
                    sdp_m_line_index: init.sdp_mline_index,
                };
                em.emit(|p| TransportEvent::CandidateGenerated(p, candidate))
                    .await;
            })
        }));

        let track_em = emitter.clone();
        peer_connection.on_track(Box::new(
            move |track: Arc<TrackRemote>,
                  _receiver: Arc<RTCRtpReceiver>,
                  _transceiver: Arc<RTCRtpTransceiver>| {
                let em = track_em.clone();
                Box::pin(async move {
                    let track = RemoteTrack::from_remote(track);
                    debug!("Track {:?} ({:?}) from {:?}", track.id, track.kind, em.peer_id);
                    em.emit(|p| TransportEvent::TrackAdded(p, track)).await;
                })
            },
        ));

        let mut senders = Vec::new();
        for track in media.tracks() {
            let sender = peer_connection
                .add_track(track.clone())
                .await
                .context("Failed to attach local track")?;
            senders.push((TrackKind::from(track.kind()), sender));
        }

        match role {
            Role::Initiator => {
                let dc = peer_connection
                    .create_data_channel(CHAT_CHANNEL_LABEL, None)
                    .await
                    .context("Failed to create chat channel")?;
                wire_data_channel(dc, emitter, channel.clone()).await;
            }
            Role::Responder => {
                let dc_em = emitter;
                let dc_slot = channel.clone();
                peer_connection.on_data_channel(Box::new(move |dc: Arc<RTCDataChannel>| {
                    let em = dc_em.clone();
                    let slot = dc_slot.clone();
                    Box::pin(async move {
                        wire_data_channel(dc, em, slot).await;
                    })
                }));
            }
        }

        Ok(Self {
            peer_id,
            peer_connection,
            channel,
            senders: Mutex::new(senders),
            muted,
        })
    }
}

async fn wire_data_channel(dc: Arc<RTCDataChannel>, emitter: Emitter, slot: ChannelSlot) {
    if dc.label() != CHAT_CHANNEL_LABEL {
        debug!(
            "Ignoring data channel '{}' from {:?}",
            dc.label(),
            emitter.peer_id
        );
        return;
    }

    let open_em = emitter.clone();
    dc.on_open(Box::new(move || {
        Box::pin(async move {
            info!("Chat channel open for {:?}", open_em.peer_id);
            open_em.emit(TransportEvent::DataChannelOpen).await;
        })
    }));

    let close_em = emitter.clone();
    dc.on_close(Box::new(move || {
        let em = close_em.clone();
        Box::pin(async move {
            em.emit(TransportEvent::DataChannelClosed).await;
        })
    }));

    let msg_em = emitter;
    dc.on_message(Box::new(move |msg: DataChannelMessage| {
        let em = msg_em.clone();
        Box::pin(async move {
            match String::from_utf8(msg.data.to_vec()) {
                Ok(text) => em.emit(|p| TransportEvent::Message(p, text)).await,
                Err(_) => warn!("Dropping non UTF-8 chat frame from {:?}", em.peer_id),
            }
        })
    }));

    *slot.lock().await = Some(dc);
}

#[async_trait]
impl PeerLink for ConnectionWrapper {
    async fn create_offer(&self) -> Result<String> {
        let offer = self.peer_connection.create_offer(None).await?;
        self.peer_connection
            .set_local_description(offer.clone())
            .await?;
        Ok(offer.sdp)
    }

    async fn accept_offer(&self, sdp: String) -> Result<String> {
        let desc = RTCSessionDescription::offer(sdp)?;
        self.peer_connection.set_remote_description(desc).await?;

        let answer = self.peer_connection.create_answer(None).await?;
        self.peer_connection
            .set_local_description(answer.clone())
            .await?;
        Ok(answer.sdp)
    }

    async fn accept_answer(&self, sdp: String) -> Result<()> {
        let desc = RTCSessionDescription::answer(sdp)?;
        self.peer_connection.set_remote_description(desc).await?;
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()> {
        let init = RTCIceCandidateInit {
            candidate: candidate.candidate,
            sdp_mid: candidate.sdp_mid,
            sdp_mline_index: candidate.sdp_m_line_index,
            username_fragment: None,
        };
        self.peer_connection.add_ice_candidate(init).await?;
        Ok(())
    }

    async fn replace_track(&self, kind: TrackKind, track: Option<LocalTrack>) -> Result<bool> {
        let senders = self.senders.lock().await;
        let mut replaced = false;
        for (_, sender) in senders.iter().filter(|(k, _)| *k == kind) {
            sender
                .replace_track(track.clone())
                .await
                .with_context(|| format!("Failed to replace {:?} track", kind))?;
            replaced = true;
        }
        if replaced {
            debug!(
                "Outbound {:?} for {:?} is now {:?}",
                kind,
                self.peer_id,
                track.as_ref().map(|t| t.id().to_owned())
            );
        }
        Ok(replaced)
    }

    async fn send_text(&self, text: &str) -> Result<()> {
        let guard = self.channel.lock().await;
        let Some(dc) = guard.as_ref() else {
            bail!("Chat channel to {:?} is not open", self.peer_id);
        };
        dc.send_text(text.to_owned()).await?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.muted.store(true, Ordering::Release);
        if let Some(dc) = self.channel.lock().await.take() {
            let _ = dc.close().await;
        }
        self.peer_connection.close().await?;
        Ok(())
    }
}

/// Production [`PeerConnector`] backed by webrtc-rs.
#[derive(Debug, Clone, Default)]
pub struct RtcConnector {
    config: TransportConfig,
}

impl RtcConnector {
    pub fn new(config: TransportConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl PeerConnector for RtcConnector {
    async fn connect(
        &self,
        peer_id: PeerId,
        role: Role,
        media: &LocalMedia,
        events: EventSink,
    ) -> Result<Arc<dyn PeerLink>> {
        let link =
            ConnectionWrapper::new(peer_id, role, self.config.clone(), media, events).await?;
        Ok(Arc::new(link))
    }

    fn update_ice_servers(&mut self, ice_servers: Vec<IceServerConfig>) {
        info!("Using {} ICE server(s) announced by relay", ice_servers.len());
        self.config.ice_servers = ice_servers;
    }
}
