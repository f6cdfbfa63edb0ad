use crate::error::BridgeResult;
use livebridge_core::{IceCandidate, OfferResponse, SessionDescription};
use tokio::sync::oneshot;

/// Commands the manager sends to a session actor.
#[derive(Debug)]
pub enum SessionCommand {
    /// Apply the client's offer and answer it once ICE gathering is done or
    /// the gathering timeout passes.
    Negotiate {
        offer: SessionDescription,
        reply: oneshot::Sender<BridgeResult<OfferResponse>>,
    },

    /// Remote candidate trickled in over HTTP.
    AddIceCandidate {
        candidate: IceCandidate,
        reply: oneshot::Sender<BridgeResult<()>>,
    },

    /// Tear the session down. The reply fires once teardown has finished.
    Shutdown {
        reason: ShutdownReason,
        reply: oneshot::Sender<()>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    Requested,
    Replaced,
}
