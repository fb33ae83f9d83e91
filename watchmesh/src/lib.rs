pub use watchmesh_core::model::{PeerId, RoomId};

pub mod model {
    pub use watchmesh_core::model::*;
}

#[cfg(feature = "server")]
pub mod server {
    pub use watchmesh_relay::*;
}

#[cfg(feature = "client")]
pub mod client {
    pub use watchmesh_client::*;
}
