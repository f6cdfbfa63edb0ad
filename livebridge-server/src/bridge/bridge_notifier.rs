use livebridge_core::{BridgeEvent, BridgeNotification};
use tokio::sync::broadcast;
use tracing::trace;

const NOTIFICATION_BUFFER: usize = 256;

/// Fan-out of session lifecycle events. Delivery is at-most-once: slow or
/// late subscribers miss what was sent before they caught up.
#[derive(Clone)]
pub struct BridgeNotifier {
    tx: broadcast::Sender<BridgeNotification>,
}

impl BridgeNotifier {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(NOTIFICATION_BUFFER);
        Self { tx }
    }

    pub fn publish(&self, stream_id: &str, event: BridgeEvent) {
        trace!("[{}] Notify {}", stream_id, event.name());
        // No subscribers is fine.
        let _ = self.tx.send(BridgeNotification {
            stream_id: stream_id.to_owned(),
            event,
        });
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BridgeNotification> {
        self.tx.subscribe()
    }
}

impl Default for BridgeNotifier {
    fn default() -> Self {
        Self::new()
    }
}
