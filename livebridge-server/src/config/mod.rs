mod bridge_config;
mod server_config;

pub use bridge_config::*;
pub use server_config::*;
