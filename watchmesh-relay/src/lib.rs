mod config;
mod room;
mod server;
mod signaling;

pub use config::RelayConfig;
pub use room::RoomRegistry;
pub use server::{router, serve};
pub use signaling::{RelayService, ws_handler};
