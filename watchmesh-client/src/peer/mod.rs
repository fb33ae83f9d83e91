mod peer_manager;
mod peer_state;

pub use peer_manager::{ManagerEvent, PeerConnectionManager};
pub use peer_state::{InvalidTransition, PeerState};
