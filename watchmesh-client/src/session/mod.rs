mod session;
mod session_command;
mod session_event;
mod session_handle;

pub use session::Session;
pub use session_command::SessionCommand;
pub use session_event::{JoinInfo, SessionEvent, SessionSnapshot};
pub use session_handle::SessionHandle;

use crate::clock::{Clock, SystemClock};
use crate::config::SessionConfig;
use crate::relay::WsRelay;
use crate::sync::MediaPlayer;
use crate::transport::{RtcConnector, TransportConfig};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Connect to the relay at `url` and start a session with the webrtc-rs
/// transport and the system clock.
pub async fn connect(
    url: &str,
    config: SessionConfig,
    player: Box<dyn MediaPlayer>,
) -> anyhow::Result<(SessionHandle, mpsc::UnboundedReceiver<SessionEvent>)> {
    let (relay, relay_rx) = WsRelay::connect(url).await?;
    let connector = RtcConnector::new(TransportConfig::new(config.ice_servers.clone()));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    Ok(Session::spawn(
        config,
        Arc::new(relay),
        relay_rx,
        Box::new(connector),
        player,
        clock,
    ))
}
