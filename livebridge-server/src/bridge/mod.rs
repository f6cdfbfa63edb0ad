mod bridge_manager;
mod bridge_notifier;
mod bridge_routes;
mod bridge_session;
mod session_command;
mod session_handle;
mod session_state;

pub use bridge_manager::*;
pub use bridge_notifier::*;
pub use bridge_routes::*;
pub use bridge_session::*;
pub use session_command::*;
pub use session_handle::*;
pub use session_state::*;
