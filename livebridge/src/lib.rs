pub use livebridge_core::{ConnectionId, IceServerConfig, TurnServerConfig, resolve_ice_servers};

pub mod model {
    pub use livebridge_core::model::*;
}

#[cfg(feature = "server")]
pub mod server {
    pub use livebridge_server::*;
}
