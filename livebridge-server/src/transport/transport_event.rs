use crate::transport::MediaTrack;
use livebridge_core::{IceCandidate, PeerState};
use std::sync::Arc;

/// Events a peer link emits towards the session that owns it.
pub enum PeerEvent {
    /// A local candidate was gathered.
    IceCandidate(IceCandidate),

    /// Local ICE gathering finished; no more `IceCandidate` events follow.
    IceGatheringComplete,

    ConnectionState(PeerState),

    /// The remote side started sending a media track.
    Track(Arc<dyn MediaTrack>),
}

impl std::fmt::Debug for PeerEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PeerEvent::IceCandidate(c) => f.debug_tuple("IceCandidate").field(&c.candidate).finish(),
            PeerEvent::IceGatheringComplete => f.write_str("IceGatheringComplete"),
            PeerEvent::ConnectionState(s) => f.debug_tuple("ConnectionState").field(s).finish(),
            PeerEvent::Track(t) => f.debug_tuple("Track").field(&t.kind()).finish(),
        }
    }
}
