use crate::bridge::{BridgeNotifier, BridgeSession, SessionMap, SessionParams, ShutdownReason};
use crate::config::BridgeConfig;
use crate::error::{BridgeError, BridgeResult};
use crate::pipeline::PipelineLauncher;
use crate::transport::RtcEngine;
use dashmap::DashMap;
use futures::future::join_all;
use livebridge_core::{
    BridgeNotification, BridgeStats, IceCandidate, OfferRequest, OfferResponse, StreamStatus,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

const PEER_EVENT_BUFFER: usize = 64;

/// Owns every bridge session, keyed by stream id.
#[derive(Clone)]
pub struct BridgeManager {
    sessions: SessionMap,
    engine: Arc<dyn RtcEngine>,
    launcher: Arc<dyn PipelineLauncher>,
    config: Arc<BridgeConfig>,
    notifier: BridgeNotifier,
    next_session_id: Arc<AtomicU64>,
}

impl BridgeManager {
    pub fn new(
        engine: Arc<dyn RtcEngine>,
        launcher: Arc<dyn PipelineLauncher>,
        config: BridgeConfig,
    ) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            engine,
            launcher,
            config: Arc::new(config),
            notifier: BridgeNotifier::new(),
            next_session_id: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn is_available(&self) -> bool {
        self.engine.check_available().is_ok()
    }

    /// Creates a session for `stream_id`, replacing any existing one, and
    /// answers the client's offer.
    pub async fn handle_offer(
        &self,
        stream_id: &str,
        request: OfferRequest,
    ) -> BridgeResult<OfferResponse> {
        let stream_id = required("streamId", stream_id)?;
        let stream_key = required("streamKey", request.stream_key.as_deref().unwrap_or_default())?;
        let offer = request
            .offer
            .ok_or_else(|| BridgeError::Validation("offer is required".to_owned()))?;
        if offer.sdp_type != "offer" {
            return Err(BridgeError::Validation(format!(
                "offer.type must be 'offer', got '{}'",
                offer.sdp_type
            )));
        }
        if offer.sdp.trim().is_empty() {
            return Err(BridgeError::Validation("offer.sdp is required".to_owned()));
        }

        let (events_tx, events_rx) = mpsc::channel(PEER_EVENT_BUFFER);
        let link = self
            .engine
            .create_peer(&self.config.ice_servers(), events_tx)
            .await?;

        let session_id = self.next_session_id.fetch_add(1, Ordering::Relaxed);
        let handle = BridgeSession::spawn(SessionParams {
            stream_id: stream_id.to_owned(),
            stream_key: stream_key.to_owned(),
            session_id,
            link,
            events: events_rx,
            config: self.config.clone(),
            launcher: self.launcher.clone(),
            sessions: self.sessions.clone(),
            notifier: self.notifier.clone(),
        });
        info!("Created bridge session {} for stream '{}'", session_id, stream_id);

        if let Some(previous) = self.sessions.insert(stream_id.to_owned(), handle.clone()) {
            info!(
                "Replacing session {} for stream '{}'",
                previous.session_id(),
                stream_id
            );
            previous.shutdown(ShutdownReason::Replaced).await;
        }

        match handle.negotiate(offer).await {
            Ok(response) => Ok(response),
            Err(e) => {
                self.sessions
                    .remove_if(stream_id, |_, h| h.session_id() == session_id);
                handle.shutdown(ShutdownReason::Requested).await;
                Err(e)
            }
        }
    }

    /// Returns `false` when there is no live session for `stream_id`.
    pub async fn handle_ice_candidate(
        &self,
        stream_id: &str,
        candidate: IceCandidate,
    ) -> BridgeResult<bool> {
        self.engine.check_available()?;
        if candidate.candidate.trim().is_empty() {
            return Err(BridgeError::Validation(
                "candidate.candidate is required".to_owned(),
            ));
        }
        let Some(handle) = self.sessions.get(stream_id).map(|entry| entry.clone()) else {
            debug!("ICE candidate for unknown stream '{}'", stream_id);
            return Ok(false);
        };
        handle.add_ice_candidate(candidate).await
    }

    /// Idempotent. Returns once the session, if any, is fully torn down.
    pub async fn cleanup_stream(&self, stream_id: &str) {
        match self.sessions.remove(stream_id) {
            Some((_, handle)) => {
                info!("Cleaning up stream '{}'", stream_id);
                handle.shutdown(ShutdownReason::Requested).await;
            }
            None => debug!("Cleanup for stream '{}': nothing to do", stream_id),
        }
    }

    pub fn status(&self, stream_id: &str) -> BridgeResult<StreamStatus> {
        self.sessions
            .get(stream_id)
            .map(|entry| entry.status())
            .ok_or_else(|| BridgeError::NotFound(stream_id.to_owned()))
    }

    pub fn stats(&self) -> BridgeStats {
        BridgeStats {
            active_streams: self.sessions.len(),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BridgeNotification> {
        self.notifier.subscribe()
    }

    /// Tears down every session.
    pub async fn shutdown(&self) {
        let stream_ids: Vec<String> = self
            .sessions
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        if stream_ids.is_empty() {
            return;
        }

        warn!("Shutting down {} bridge sessions", stream_ids.len());
        join_all(stream_ids.iter().map(|id| self.cleanup_stream(id))).await;
    }
}

fn required<'a>(field: &str, value: &'a str) -> BridgeResult<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(BridgeError::Validation(format!("{field} is required")));
    }
    Ok(trimmed)
}
