mod rtc_engine;
mod transport_event;
mod unavailable_engine;
mod webrtc_engine;

pub use rtc_engine::*;
pub use transport_event::*;
pub use unavailable_engine::*;
pub use webrtc_engine::*;

use std::sync::Arc;
use tracing::{error, info};

/// Picks the engine once at startup. Falls back to [`UnavailableEngine`] when
/// the bridge is disabled or WebRTC fails to initialise.
pub fn select_engine(enabled: bool) -> Arc<dyn RtcEngine> {
    if !enabled {
        info!("Bridge disabled by configuration");
        return Arc::new(UnavailableEngine::new("bridge disabled by configuration"));
    }

    match WebRtcEngine::new() {
        Ok(engine) => Arc::new(engine),
        Err(e) => {
            error!("WebRTC engine unavailable: {:#}", e);
            Arc::new(UnavailableEngine::new(format!("WebRTC engine failed to initialise: {e:#}")))
        }
    }
}
