use async_trait::async_trait;
use livebridge_core::{ConnectionId, ServerSignal};

/// Outbound side of the signaling transport: whatever owns the client sockets
/// implements this so the relay can address a connection.
#[async_trait]
pub trait SignalingOutput: Send + Sync {
    /// Deliver one frame to a connection. Unknown connections are dropped.
    async fn deliver(&self, connection_id: ConnectionId, signal: ServerSignal);
}
