use crate::chat::{ChatHistory, ChatRoute, normalize_outgoing};
use crate::clock::Clock;
use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::membership::Membership;
use crate::peer::{ManagerEvent, PeerConnectionManager};
use crate::relay::RelayChannel;
use crate::session::session_command::SessionCommand;
use crate::session::session_event::{JoinInfo, SessionEvent, SessionSnapshot};
use crate::session::session_handle::SessionHandle;
use crate::sync::{MediaPlayer, PlaybackSync, PlayerCommand};
use crate::transport::{LinkEvent, LocalMedia, PeerConnector};
use std::ops::ControlFlow;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};
use watchmesh_core::{
    BroadcastPayload, ChatMessage, ClientMessage, PeerId, RelayMessage, RoomId, SourceType,
    WatchEvent,
};

/// The client-side actor. Owns the peer connections, the roster and host
/// belief, the playback synchronizer, the chat log and the media player, and
/// mutates them only from [`Session::run`].
pub struct Session {
    config: SessionConfig,
    relay: Arc<dyn RelayChannel>,
    relay_rx: mpsc::UnboundedReceiver<RelayMessage>,
    transport_rx: mpsc::Receiver<LinkEvent>,
    command_rx: mpsc::Receiver<SessionCommand>,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    manager: PeerConnectionManager,
    player: Box<dyn MediaPlayer>,
    clock: Arc<dyn Clock>,
    sync: PlaybackSync,
    chat: ChatHistory,
    self_id: Option<PeerId>,
    room: Option<RoomId>,
    membership: Option<Membership>,
    pending_join: Option<oneshot::Sender<Result<JoinInfo, SessionError>>>,
}

impl Session {
    pub fn new(
        config: SessionConfig,
        relay: Arc<dyn RelayChannel>,
        relay_rx: mpsc::UnboundedReceiver<RelayMessage>,
        connector: Box<dyn PeerConnector>,
        player: Box<dyn MediaPlayer>,
        clock: Arc<dyn Clock>,
    ) -> (Self, SessionHandle, mpsc::UnboundedReceiver<SessionEvent>) {
        let (transport_tx, transport_rx) = mpsc::channel(256);
        let (command_tx, command_rx) = mpsc::channel(64);
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let manager = PeerConnectionManager::new(connector, relay.clone(), transport_tx, &config);

        let session = Self {
            sync: PlaybackSync::new(config.drift_threshold_secs),
            chat: ChatHistory::new(config.chat_history_limit),
            config,
            relay,
            relay_rx,
            transport_rx,
            command_rx,
            events_tx,
            manager,
            player,
            clock,
            self_id: None,
            room: None,
            membership: None,
            pending_join: None,
        };

        (session, SessionHandle::new(command_tx), events_rx)
    }

    /// Build a session and run it on the tokio runtime.
    pub fn spawn(
        config: SessionConfig,
        relay: Arc<dyn RelayChannel>,
        relay_rx: mpsc::UnboundedReceiver<RelayMessage>,
        connector: Box<dyn PeerConnector>,
        player: Box<dyn MediaPlayer>,
        clock: Arc<dyn Clock>,
    ) -> (SessionHandle, mpsc::UnboundedReceiver<SessionEvent>) {
        let (session, handle, events) = Self::new(config, relay, relay_rx, connector, player, clock);
        tokio::spawn(session.run());
        (handle, events)
    }

    pub async fn run(mut self) {
        info!("Session event loop started");

        let mut sync_tick = interval(self.config.sync_interval());
        sync_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut sweep_tick = interval(self.config.sweep_interval());
        sweep_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                msg = self.relay_rx.recv() => {
                    match msg {
                        Some(m) => self.handle_relay(m).await,
                        None => {
                            warn!("Relay connection lost");
                            self.on_relay_lost().await;
                            break;
                        }
                    }
                }

                Some(evt) = self.transport_rx.recv() => {
                    let now = self.clock.now_ms();
                    if let Some(ev) = self.manager.handle_transport_event(evt).await {
                        self.on_manager_event(ev, now);
                    }
                }

                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(c) => {
                            if self.handle_command(c).await.is_break() {
                                break;
                            }
                        }
                        None => {
                            info!("All session handles dropped. Shutting down session.");
                            self.shutdown().await;
                            break;
                        }
                    }
                }

                _ = sync_tick.tick() => self.on_sync_tick().await,

                _ = sweep_tick.tick() => {
                    let now = self.clock.now_ms();
                    for ev in self.manager.sweep_stalled(now).await {
                        self.on_manager_event(ev, now);
                    }
                }
            }
        }

        info!("Session event loop finished");
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.events_tx.send(event);
    }

    async fn handle_relay(&mut self, msg: RelayMessage) {
        let now = self.clock.now_ms();

        match msg {
            RelayMessage::Welcome { peer_id } => {
                info!("Relay assigned id {:?}", peer_id);
                self.self_id = Some(peer_id.clone());
                self.emit(SessionEvent::Welcome(peer_id));
            }

            RelayMessage::IceConfig { ice_servers } => {
                self.manager.update_ice_servers(ice_servers);
            }

            RelayMessage::Peers { peers } => self.on_roster(peers, now).await,

            RelayMessage::PeerJoined { peer_id } => self.on_peer_joined(peer_id, now).await,

            RelayMessage::PeerLeft { peer_id } => self.on_peer_left(peer_id).await,

            RelayMessage::Signal { from, data } => {
                if let Some(ev) = self.manager.handle_signal(from, data, now).await {
                    self.on_manager_event(ev, now);
                }
            }

            RelayMessage::Broadcast { from, payload } => {
                match serde_json::from_value::<BroadcastPayload>(payload) {
                    Ok(BroadcastPayload::Chat { text, ts }) => self.record_chat(ChatMessage {
                        from,
                        text,
                        ts: ts.unwrap_or(now),
                    }),
                    Ok(BroadcastPayload::Watch(event)) => {
                        self.on_watch_event(from, event, now).await
                    }
                    Err(e) => warn!("Ignoring unknown broadcast from {:?}: {}", from, e),
                }
            }
        }
    }

    async fn on_roster(&mut self, peers: Vec<PeerId>, now: u64) {
        let (Some(self_id), Some(room)) = (self.self_id.clone(), self.room.clone()) else {
            warn!("Unexpected roster, not joining any room");
            return;
        };

        let membership = Membership::from_roster(self_id.clone(), peers);
        info!(
            "Joined '{}' with {} other peer(s), host: {}",
            room,
            membership.roster().len(),
            membership.is_host()
        );

        for peer_id in membership.roster().to_vec() {
            if let Err(e) = self.manager.initiate(peer_id.clone(), now).await {
                warn!("Failed to connect to {:?}: {}", peer_id, e);
            }
        }

        let info = JoinInfo {
            room,
            self_id,
            is_host: membership.is_host(),
            participants: membership.participants(),
        };
        self.membership = Some(membership);

        self.emit(SessionEvent::Joined(info.clone()));
        if let Some(reply) = self.pending_join.take() {
            let _ = reply.send(Ok(info));
        }
    }

    async fn on_peer_joined(&mut self, peer_id: PeerId, now: u64) {
        let Some(membership) = self.membership.as_mut() else {
            debug!("Ignoring peer-joined outside of a room");
            return;
        };
        if !membership.on_peer_joined(peer_id.clone()) {
            return;
        }
        let is_host = membership.is_host();

        info!("Peer {:?} joined", peer_id);
        self.emit(SessionEvent::PeerJoined(peer_id));

        // the newcomer initiates; the host only brings it up to date
        if is_host {
            self.broadcast_state(now).await;
        }
    }

    async fn on_peer_left(&mut self, peer_id: PeerId) {
        info!("Peer {:?} left", peer_id);
        self.emit(SessionEvent::PeerLeft(peer_id.clone()));

        if let Some(membership) = self.membership.as_mut()
            && membership.on_peer_left(&peer_id)
        {
            self.emit(SessionEvent::HostChanged(None));
        }
        if self.manager.remove(&peer_id).await {
            self.emit(SessionEvent::PeerRemoved(peer_id));
        }
    }

    async fn on_watch_event(&mut self, from: PeerId, event: WatchEvent, now: u64) {
        let believed_host = self.membership.as_ref().and_then(|m| m.host());
        if event.requires_host() && believed_host != Some(&from) {
            info!(
                "{} from {:?}, host is {:?}; applying anyway",
                event.action(),
                from,
                believed_host
            );
        }

        if let WatchEvent::HostTransfer { host, .. } = event {
            if let Some(membership) = self.membership.as_mut()
                && membership.apply_transfer(host.clone())
            {
                self.emit(SessionEvent::HostChanged(Some(host)));
            }
            return;
        }

        let is_host = self.membership.as_ref().is_some_and(|m| m.is_host());
        let local = self.player.position().await;
        let commands = self.sync.reconcile(&event, now, local, is_host);
        if commands.is_empty() {
            debug!("No correction for {} from {:?}", event.action(), from);
            return;
        }

        let applied = self.apply(&commands).await;
        if !applied.iter().any(|c| c.carries(&event)) {
            debug!("{} from {:?} was not applied", event.action(), from);
            return;
        }

        match event {
            WatchEvent::StateSync { .. } => {
                let target = applied
                    .iter()
                    .find_map(|c| match c {
                        PlayerCommand::Seek(t) => Some(*t),
                        _ => None,
                    })
                    .unwrap_or(local);
                info!(
                    "Drift corrected to {:.2}s (was {:.2}s, threshold {:.2}s)",
                    target,
                    local,
                    self.sync.drift_threshold()
                );
                self.emit(SessionEvent::DriftCorrected { from, target });
            }
            _ => {
                debug!("Applied {} from {:?}", event.action(), from);
                self.emit(SessionEvent::WatchApplied {
                    from,
                    action: event.action(),
                });
            }
        }
    }

    /// Player failures (no source yet, not seekable) are logged and skipped.
    /// Returns the commands the player accepted.
    async fn apply(&mut self, commands: &[PlayerCommand]) -> Vec<PlayerCommand> {
        let mut applied = Vec::with_capacity(commands.len());
        for cmd in commands {
            let result = match cmd {
                PlayerCommand::Load { source_type, url } => {
                    self.player.load(*source_type, url).await
                }
                PlayerCommand::Seek(t) => self.player.seek(*t).await,
                PlayerCommand::Play => self.player.play().await,
                PlayerCommand::Pause => self.player.pause().await,
            };
            match result {
                Ok(()) => applied.push(cmd.clone()),
                Err(e) => warn!("Player rejected {:?}: {:#}", cmd, e),
            }
        }
        applied
    }

    fn on_manager_event(&mut self, event: ManagerEvent, now: u64) {
        match event {
            ManagerEvent::Connected(peer_id) => self.emit(SessionEvent::PeerConnected(peer_id)),
            ManagerEvent::Removed(peer_id) => self.emit(SessionEvent::PeerRemoved(peer_id)),
            ManagerEvent::ChannelOpened(peer_id) => {
                self.emit(SessionEvent::ChannelOpened(peer_id))
            }
            ManagerEvent::ChannelClosed(peer_id) => {
                self.emit(SessionEvent::ChannelClosed(peer_id))
            }
            ManagerEvent::StreamUpdated(peer_id, stream) => {
                self.emit(SessionEvent::StreamUpdated { peer_id, stream })
            }
            ManagerEvent::Message(from, text) => self.record_chat(ChatMessage {
                from,
                text,
                ts: now,
            }),
        }
    }

    fn record_chat(&mut self, msg: ChatMessage) {
        debug!("Chat from {:?}: {} byte(s)", msg.from, msg.text.len());
        self.chat.push(msg.clone());
        self.emit(SessionEvent::ChatReceived(msg));
    }

    /// Breaks once the session should stop.
    async fn handle_command(&mut self, cmd: SessionCommand) -> ControlFlow<()> {
        let now = self.clock.now_ms();

        match cmd {
            SessionCommand::Join { room, reply } => self.join(room, reply).await,
            SessionCommand::TakeHost { reply } => {
                let _ = reply.send(self.take_host(now).await);
            }
            SessionCommand::Load {
                source_type,
                url,
                reply,
            } => {
                let _ = reply.send(self.load(source_type, url, now).await);
            }
            SessionCommand::Play { reply } => {
                let _ = reply.send(self.play(now).await);
            }
            SessionCommand::Pause { reply } => {
                let _ = reply.send(self.pause(now).await);
            }
            SessionCommand::Seek { time, reply } => {
                let _ = reply.send(self.seek(time, now).await);
            }
            SessionCommand::SeekBy { delta, reply } => {
                let target = self.player.position().await + delta;
                let _ = reply.send(self.seek(target, now).await);
            }
            SessionCommand::SendChat { text, reply } => {
                let _ = reply.send(self.send_chat(&text, now).await);
            }
            SessionCommand::SetLocalMedia { media, reply } => {
                info!("Local media set: {:?}", media);
                self.manager.set_local_media(media);
                let _ = reply.send(());
            }
            SessionCommand::ReplaceTrack { track, reply } => {
                let _ = reply.send(self.manager.replace_local_track(track).await);
            }
            SessionCommand::SetTrackEnabled {
                kind,
                enabled,
                reply,
            } => {
                let _ = reply.send(self.manager.set_track_enabled(kind, enabled).await);
            }
            SessionCommand::Snapshot { reply } => {
                let _ = reply.send(self.snapshot().await);
            }
            SessionCommand::Leave { reply } => {
                self.shutdown().await;
                let _ = reply.send(());
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    async fn join(&mut self, room: RoomId, reply: oneshot::Sender<Result<JoinInfo, SessionError>>) {
        if let Some(previous) = self.pending_join.take() {
            let _ = previous.send(Err(SessionError::Relay("join superseded".into())));
        }
        if self.membership.take().is_some() {
            info!("Leaving room {:?}", self.room);
            self.manager.close_all().await;
            self.chat.clear();
        }

        if let Err(e) = self
            .relay
            .send(ClientMessage::Join { room: room.clone() })
            .await
        {
            let _ = reply.send(Err(e));
            return;
        }

        info!("Joining room '{}'", room);
        self.room = Some(room);
        self.pending_join = Some(reply);
    }

    fn require_host(&self) -> Result<(), SessionError> {
        match &self.membership {
            None => Err(SessionError::NotJoined),
            Some(m) if !m.is_host() => Err(SessionError::NotHost),
            Some(_) => Ok(()),
        }
    }

    async fn take_host(&mut self, now: u64) -> Result<(), SessionError> {
        let membership = self.membership.as_mut().ok_or(SessionError::NotJoined)?;
        let self_id = membership.self_id().clone();
        membership.take_host();

        self.broadcast(BroadcastPayload::Watch(WatchEvent::HostTransfer {
            at: now,
            host: self_id.clone(),
        }))
        .await?;

        info!("Took over as host");
        self.emit(SessionEvent::HostChanged(Some(self_id)));
        Ok(())
    }

    async fn load(
        &mut self,
        source_type: Option<SourceType>,
        url: String,
        now: u64,
    ) -> Result<(), SessionError> {
        self.require_host()?;
        let source_type = source_type.unwrap_or_else(|| SourceType::detect(&url));
        let time = self.player.position().await;

        self.broadcast(BroadcastPayload::Watch(WatchEvent::Load {
            source_type,
            url: url.clone(),
            at: now,
            time: Some(time),
        }))
        .await?;

        info!("Loading {:?} source {}", source_type, url);
        self.apply(&[PlayerCommand::Load { source_type, url }]).await;
        Ok(())
    }

    async fn play(&mut self, now: u64) -> Result<(), SessionError> {
        self.require_host()?;
        let time = self.player.position().await;
        self.broadcast(BroadcastPayload::Watch(WatchEvent::Play { at: now, time }))
            .await?;
        self.apply(&[PlayerCommand::Play]).await;
        Ok(())
    }

    async fn pause(&mut self, now: u64) -> Result<(), SessionError> {
        self.require_host()?;
        let time = self.player.position().await;
        self.broadcast(BroadcastPayload::Watch(WatchEvent::Pause { at: now, time }))
            .await?;
        self.apply(&[PlayerCommand::Pause]).await;
        Ok(())
    }

    async fn seek(&mut self, time: f64, now: u64) -> Result<(), SessionError> {
        self.require_host()?;
        let time = time.max(0.0);
        self.broadcast(BroadcastPayload::Watch(WatchEvent::Seek { at: now, time }))
            .await?;
        self.apply(&[PlayerCommand::Seek(time)]).await;
        Ok(())
    }

    async fn send_chat(&mut self, text: &str, now: u64) -> Result<Option<ChatRoute>, SessionError> {
        let self_id = self
            .membership
            .as_ref()
            .map(|m| m.self_id().clone())
            .ok_or(SessionError::NotJoined)?;
        let Some(text) = normalize_outgoing(text) else {
            return Ok(None);
        };
        let text = text.to_owned();

        let delivered = self.manager.send_text_all(&text).await;
        let route = if delivered > 0 {
            ChatRoute::Direct { delivered }
        } else {
            debug!("No open chat channel, sending through relay");
            self.broadcast(BroadcastPayload::Chat {
                text: text.clone(),
                ts: Some(now),
            })
            .await?;
            ChatRoute::Relay
        };

        self.chat.push(ChatMessage {
            from: self_id,
            text,
            ts: now,
        });
        Ok(Some(route))
    }

    async fn broadcast(&self, payload: BroadcastPayload) -> Result<(), SessionError> {
        let payload = serde_json::to_value(&payload)?;
        self.relay.send(ClientMessage::Broadcast { payload }).await
    }

    async fn broadcast_state(&self, now: u64) {
        let time = self.player.position().await;
        let payload = BroadcastPayload::Watch(WatchEvent::StateSync { at: now, time });
        if let Err(e) = self.broadcast(payload).await {
            warn!("Failed to broadcast playback state: {}", e);
        }
    }

    async fn on_sync_tick(&mut self) {
        if self.membership.as_ref().is_some_and(|m| m.is_host()) {
            let now = self.clock.now_ms();
            self.broadcast_state(now).await;
        }
    }

    async fn snapshot(&self) -> SessionSnapshot {
        let membership = self.membership.as_ref();
        SessionSnapshot {
            self_id: self.self_id.clone(),
            room: self.room.clone(),
            is_host: membership.is_some_and(|m| m.is_host()),
            host: membership.and_then(|m| m.host().cloned()),
            participants: membership.map(|m| m.participants()).unwrap_or_default(),
            peers: self.manager.states(),
            open_channels: self.manager.open_channel_count(),
            position: self.player.position().await,
            paused: self.player.is_paused().await,
            source: self.player.source().await,
            muted: self.manager.muted_tracks(),
            chat: self.chat.to_vec(),
        }
    }

    async fn on_relay_lost(&mut self) {
        self.manager.close_all().await;
        self.membership = None;
        if let Some(reply) = self.pending_join.take() {
            let _ = reply.send(Err(SessionError::Relay("relay connection lost".into())));
        }
        self.emit(SessionEvent::RelayLost);
    }

    async fn shutdown(&mut self) {
        info!("Leaving session");
        self.manager.close_all().await;
        self.manager.set_local_media(LocalMedia::default());
        self.relay.disconnect().await;
        self.membership = None;
        self.room = None;
        if let Some(reply) = self.pending_join.take() {
            let _ = reply.send(Err(SessionError::SessionClosed));
        }
        self.emit(SessionEvent::Left);
    }
}
