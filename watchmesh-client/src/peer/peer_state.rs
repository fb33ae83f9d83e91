use thiserror::Error;

/// Lifecycle of one remote peer's connection.
///
/// ```text
/// Idle ──> Negotiating ──> Connected
///   │           │              │
///   └───────────┴──> Failed <──┘
/// any non-closed state ──> Closed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerState {
    Idle,
    Negotiating,
    Connected,
    Failed,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid peer transition {from:?} -> {to:?}")]
pub struct InvalidTransition {
    pub from: PeerState,
    pub to: PeerState,
}

impl PeerState {
    /// Idempotent while already negotiating.
    pub fn begin_negotiation(self) -> Result<Self, InvalidTransition> {
        match self {
            PeerState::Idle | PeerState::Negotiating => Ok(PeerState::Negotiating),
            from => Err(InvalidTransition {
                from,
                to: PeerState::Negotiating,
            }),
        }
    }

    pub fn connect(self) -> Result<Self, InvalidTransition> {
        match self {
            PeerState::Negotiating | PeerState::Connected => Ok(PeerState::Connected),
            from => Err(InvalidTransition {
                from,
                to: PeerState::Connected,
            }),
        }
    }

    pub fn fail(self) -> Result<Self, InvalidTransition> {
        match self {
            PeerState::Idle | PeerState::Negotiating | PeerState::Connected => {
                Ok(PeerState::Failed)
            }
            from => Err(InvalidTransition {
                from,
                to: PeerState::Failed,
            }),
        }
    }

    pub fn close(self) -> Result<Self, InvalidTransition> {
        match self {
            PeerState::Closed => Err(InvalidTransition {
                from: PeerState::Closed,
                to: PeerState::Closed,
            }),
            _ => Ok(PeerState::Closed),
        }
    }

    pub fn is_terminal(self) -> bool {
        self == PeerState::Closed
    }
}
