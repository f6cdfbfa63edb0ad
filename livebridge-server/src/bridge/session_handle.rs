use crate::bridge::{SessionCommand, ShutdownReason};
use crate::error::{BridgeError, BridgeResult};
use crate::transport::PeerLink;
use dashmap::DashMap;
use livebridge_core::{IceCandidate, OfferResponse, SessionDescription, StreamStatus};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};

/// Live sessions keyed by stream id.
pub type SessionMap = Arc<DashMap<String, SessionHandle>>;

/// Cheap, cloneable reference to a running session actor.
#[derive(Clone)]
pub struct SessionHandle {
    session_id: u64,
    commands: mpsc::Sender<SessionCommand>,
    status: watch::Receiver<StreamStatus>,
    link: Arc<dyn PeerLink>,
}

impl SessionHandle {
    pub(crate) fn new(
        session_id: u64,
        commands: mpsc::Sender<SessionCommand>,
        status: watch::Receiver<StreamStatus>,
        link: Arc<dyn PeerLink>,
    ) -> Self {
        Self {
            session_id,
            commands,
            status,
            link,
        }
    }

    /// Distinguishes successive sessions of the same stream.
    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    pub async fn negotiate(&self, offer: SessionDescription) -> BridgeResult<OfferResponse> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(SessionCommand::Negotiate { offer, reply })
            .await
            .map_err(|_| session_gone())?;
        rx.await.map_err(|_| session_gone())?
    }

    /// `Ok(false)` when the session ended before the candidate reached it.
    pub async fn add_ice_candidate(&self, candidate: IceCandidate) -> BridgeResult<bool> {
        let (reply, rx) = oneshot::channel();
        if self
            .commands
            .send(SessionCommand::AddIceCandidate { candidate, reply })
            .await
            .is_err()
        {
            return Ok(false);
        }
        match rx.await {
            Ok(result) => result.map(|()| true),
            Err(_) => Ok(false),
        }
    }

    /// Returns once the session has been torn down. Returns immediately if it
    /// already was.
    pub async fn shutdown(&self, reason: ShutdownReason) {
        let (reply, rx) = oneshot::channel();
        if self
            .commands
            .send(SessionCommand::Shutdown { reason, reply })
            .await
            .is_ok()
        {
            let _ = rx.await;
        }
    }

    pub fn status(&self) -> StreamStatus {
        let mut status = self.status.borrow().clone();
        status.connection_state = self.link.connection_state();
        status.ice_connection_state = self.link.ice_connection_state();
        status
    }
}

fn session_gone() -> BridgeError {
    BridgeError::Internal("session closed during negotiation".to_owned())
}
