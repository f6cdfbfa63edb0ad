use crate::error::{BridgeError, BridgeResult};
use crate::transport::{PeerEvent, PeerLink, RtcEngine};
use async_trait::async_trait;
use livebridge_core::IceServerConfig;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Stand-in engine used when WebRTC could not be initialised or the bridge is
/// switched off. Every bridge call fails fast; signaling keeps working.
pub struct UnavailableEngine {
    reason: String,
}

impl UnavailableEngine {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl RtcEngine for UnavailableEngine {
    fn check_available(&self) -> BridgeResult<()> {
        Err(BridgeError::DependencyUnavailable(self.reason.clone()))
    }

    async fn create_peer(
        &self,
        _ice_servers: &[IceServerConfig],
        _events: mpsc::Sender<PeerEvent>,
    ) -> BridgeResult<Arc<dyn PeerLink>> {
        Err(BridgeError::DependencyUnavailable(self.reason.clone()))
    }
}
