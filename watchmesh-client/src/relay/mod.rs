mod ws_relay;

pub use ws_relay::WsRelay;

use crate::error::SessionError;
use async_trait::async_trait;
use watchmesh_core::ClientMessage;

/// Outbound half of the relay connection.
///
/// Inbound [`watchmesh_core::RelayMessage`]s are delivered on a separate
/// channel handed to the session at construction.
#[async_trait]
pub trait RelayChannel: Send + Sync {
    async fn send(&self, msg: ClientMessage) -> Result<(), SessionError>;

    async fn disconnect(&self);
}
