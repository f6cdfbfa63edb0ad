
use livebridge_server::signaling::SignalingRelay;
use std::sync::Arc;
use tracing::Level;

use crate::utils::MockSignalingOutput;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_test_writer()
        .try_init();
}

pub fn create_test_relay() -> (SignalingRelay, MockSignalingOutput) {
    let signaling = MockSignalingOutput::new();
    let relay = SignalingRelay::new(Arc::new(signaling.clone()));
    (relay, signaling)
}
