use crate::app::AppState;
use crate::error::{BridgeError, BridgeResult};
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use livebridge_core::{
    BridgeEvent, BridgeNotification, BridgeStats, IceCandidateRequest, OfferRequest,
    OfferResponse, StreamStatus, SuccessResponse,
};
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

pub async fn offer_handler(
    State(state): State<Arc<AppState>>,
    Path(stream_id): Path<String>,
    body: Result<Json<OfferRequest>, JsonRejection>,
) -> BridgeResult<Json<OfferResponse>> {
    let Json(request) = body.map_err(|e| BridgeError::Validation(e.body_text()))?;
    let response = state.bridge.handle_offer(&stream_id, request).await?;
    Ok(Json(response))
}

pub async fn ice_candidate_handler(
    State(state): State<Arc<AppState>>,
    Path(stream_id): Path<String>,
    body: Result<Json<IceCandidateRequest>, JsonRejection>,
) -> BridgeResult<Json<SuccessResponse>> {
    let Json(request) = body.map_err(|e| BridgeError::Validation(e.body_text()))?;
    let candidate = request
        .candidate
        .ok_or_else(|| BridgeError::Validation("candidate is required".to_owned()))?;

    if state.bridge.handle_ice_candidate(&stream_id, candidate).await? {
        Ok(Json(SuccessResponse { success: true }))
    } else {
        Err(BridgeError::NotFound(stream_id))
    }
}

pub async fn status_handler(
    State(state): State<Arc<AppState>>,
    Path(stream_id): Path<String>,
) -> BridgeResult<Json<StreamStatus>> {
    state.bridge.status(&stream_id).map(Json)
}

pub async fn cleanup_handler(
    State(state): State<Arc<AppState>>,
    Path(stream_id): Path<String>,
) -> Json<SuccessResponse> {
    state.bridge.cleanup_stream(&stream_id).await;
    Json(SuccessResponse { success: true })
}

pub async fn stats_handler(State(state): State<Arc<AppState>>) -> Json<BridgeStats> {
    Json(state.bridge.stats())
}

/// Server-sent lifecycle events for one live stream. Ends after `cleaned`.
pub async fn events_handler(
    State(state): State<Arc<AppState>>,
    Path(stream_id): Path<String>,
) -> BridgeResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    // Subscribe before the lookup so nothing published in between is missed.
    let rx = state.bridge.subscribe();
    state.bridge.status(&stream_id)?;

    let stream = futures::stream::unfold(Some((rx, stream_id)), |subscription| async move {
        let Some((mut rx, stream_id)) = subscription else {
            return None;
        };
        let Some((event, finished)) = next_event(&mut rx, &stream_id).await else {
            return None;
        };
        let next = (!finished).then_some((rx, stream_id));
        Some((Ok::<_, Infallible>(event), next))
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// Next notification for `stream_id` as an SSE event, plus whether it was
/// the last one.
async fn next_event(
    rx: &mut broadcast::Receiver<BridgeNotification>,
    stream_id: &str,
) -> Option<(Event, bool)> {
    loop {
        match rx.recv().await {
            Ok(notification) if notification.stream_id == stream_id => {
                let data = match serde_json::to_string(&notification) {
                    Ok(data) => data,
                    Err(e) => {
                        warn!("Failed to encode notification for '{}': {}", stream_id, e);
                        continue;
                    }
                };
                let finished = matches!(notification.event, BridgeEvent::Cleaned);
                let event = Event::default().event(notification.event.name()).data(data);
                return Some((event, finished));
            }
            Ok(_) => {}
            Err(RecvError::Lagged(missed)) => {
                warn!("Event subscriber for '{}' missed {} events", stream_id, missed);
            }
            Err(RecvError::Closed) => return None,
        }
    }
}
