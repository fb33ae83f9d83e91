use std::fmt;
use std::sync::Arc;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_remote::TrackRemote;

pub type LocalTrack = Arc<dyn TrackLocal + Send + Sync>;

/// Locally captured tracks, attached to every outbound connection.
///
/// Acquiring them (camera, microphone, screen) is up to the caller.
#[derive(Clone, Default)]
pub struct LocalMedia {
    tracks: Vec<LocalTrack>,
}

impl LocalMedia {
    pub fn new(tracks: Vec<LocalTrack>) -> Self {
        Self { tracks }
    }

    pub fn tracks(&self) -> &[LocalTrack] {
        &self.tracks
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn track(&self, kind: TrackKind) -> Option<&LocalTrack> {
        self.tracks.iter().find(|t| TrackKind::from(t.kind()) == kind)
    }

    /// Put `track` in place of the current track of the same kind, or add it.
    pub fn replace(&mut self, track: LocalTrack) {
        let kind = TrackKind::from(track.kind());
        match self
            .tracks
            .iter_mut()
            .find(|t| TrackKind::from(t.kind()) == kind)
        {
            Some(slot) => *slot = track,
            None => self.tracks.push(track),
        }
    }
}

impl fmt::Debug for LocalMedia {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.tracks.iter().map(|t| t.id()))
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackKind {
    Audio,
    Video,
    Unknown,
}

impl From<RTPCodecType> for TrackKind {
    fn from(kind: RTPCodecType) -> Self {
        match kind {
            RTPCodecType::Audio => TrackKind::Audio,
            RTPCodecType::Video => TrackKind::Video,
            _ => TrackKind::Unknown,
        }
    }
}

#[derive(Clone)]
pub struct RemoteTrack {
    pub id: String,
    pub stream_id: String,
    pub kind: TrackKind,
    /// Absent for tracks produced by in-memory transports.
    pub track: Option<Arc<TrackRemote>>,
}

impl RemoteTrack {
    pub fn new(id: impl Into<String>, stream_id: impl Into<String>, kind: TrackKind) -> Self {
        Self {
            id: id.into(),
            stream_id: stream_id.into(),
            kind,
            track: None,
        }
    }

    pub fn from_remote(track: Arc<TrackRemote>) -> Self {
        Self {
            id: track.id(),
            stream_id: track.stream_id(),
            kind: TrackKind::from(track.kind()),
            track: Some(track),
        }
    }
}

impl fmt::Debug for RemoteTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteTrack")
            .field("id", &self.id)
            .field("stream_id", &self.stream_id)
            .field("kind", &self.kind)
            .finish()
    }
}

/// All inbound tracks of one remote peer.
#[derive(Debug, Clone, Default)]
pub struct RemoteStream {
    tracks: Vec<RemoteTrack>,
}

impl RemoteStream {
    /// Add a track, replacing any earlier track with the same id.
    pub fn add(&mut self, track: RemoteTrack) {
        self.tracks.retain(|t| t.id != track.id);
        self.tracks.push(track);
    }

    pub fn tracks(&self) -> &[RemoteTrack] {
        &self.tracks
    }

    pub fn has(&self, kind: TrackKind) -> bool {
        self.tracks.iter().any(|t| t.kind == kind)
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}
