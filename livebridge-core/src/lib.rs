pub mod ice;
pub mod model;

pub use ice::{DEFAULT_STUN_SERVERS, TurnServerConfig, resolve_ice_servers};
pub use model::*;
