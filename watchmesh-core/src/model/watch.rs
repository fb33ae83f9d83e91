use crate::model::peer::PeerId;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static YOUTUBE_HOST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)youtu(\.be|be\.com)").expect("valid regex"));

static YOUTUBE_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:v=|youtu\.be/|embed/)([A-Za-z0-9_-]{6,})").expect("valid regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    /// Direct MP4/WebM URL.
    #[default]
    Url,
    Youtube,
}

impl SourceType {
    /// Guess the source type from a pasted link.
    pub fn detect(url: &str) -> Self {
        if YOUTUBE_HOST.is_match(url) {
            SourceType::Youtube
        } else {
            SourceType::Url
        }
    }
}

/// Extract the video id from a YouTube watch, short or embed link.
pub fn extract_youtube_id(url: &str) -> Option<&str> {
    YOUTUBE_ID
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Playback control event broadcast through the relay.
///
/// `at` is the sender's wall clock in epoch milliseconds, `time` is the
/// media position in seconds at that instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum WatchEvent {
    Load {
        #[serde(rename = "type")]
        source_type: SourceType,
        url: String,
        at: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        time: Option<f64>,
    },
    Play {
        at: u64,
        time: f64,
    },
    Pause {
        at: u64,
        time: f64,
    },
    Seek {
        at: u64,
        time: f64,
    },
    #[serde(rename = "state")]
    StateSync {
        at: u64,
        time: f64,
    },
    #[serde(rename = "host")]
    HostTransfer {
        at: u64,
        host: PeerId,
    },
}

impl WatchEvent {
    pub fn at(&self) -> u64 {
        match self {
            WatchEvent::Load { at, .. }
            | WatchEvent::Play { at, .. }
            | WatchEvent::Pause { at, .. }
            | WatchEvent::Seek { at, .. }
            | WatchEvent::StateSync { at, .. }
            | WatchEvent::HostTransfer { at, .. } => *at,
        }
    }

    /// Media position carried by the event. `Load` without a position means 0.
    pub fn time(&self) -> Option<f64> {
        match self {
            WatchEvent::Load { time, .. } => Some(time.unwrap_or(0.0)),
            WatchEvent::Play { time, .. }
            | WatchEvent::Pause { time, .. }
            | WatchEvent::Seek { time, .. }
            | WatchEvent::StateSync { time, .. } => Some(*time),
            WatchEvent::HostTransfer { .. } => None,
        }
    }

    /// Events only the host may originate.
    pub fn requires_host(&self) -> bool {
        !matches!(self, WatchEvent::HostTransfer { .. })
    }

    pub fn action(&self) -> &'static str {
        match self {
            WatchEvent::Load { .. } => "load",
            WatchEvent::Play { .. } => "play",
            WatchEvent::Pause { .. } => "pause",
            WatchEvent::Seek { .. } => "seek",
            WatchEvent::StateSync { .. } => "state",
            WatchEvent::HostTransfer { .. } => "host",
        }
    }
}
