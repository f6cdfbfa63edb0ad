use crate::bridge::{
    BridgeManager, cleanup_handler, events_handler, ice_candidate_handler, offer_handler,
    stats_handler, status_handler,
};
use crate::config::ServerConfig;
use crate::signaling::{SignalingRelay, SignalingService, ws_handler};
use axum::http::HeaderValue;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::warn;

/// Shared context handed to every request handler.
pub struct AppState {
    pub signaling: SignalingService,
    pub relay: SignalingRelay,
    pub bridge: BridgeManager,
}

impl AppState {
    pub fn new(bridge: BridgeManager) -> Self {
        let signaling = SignalingService::new();
        let relay = SignalingRelay::new(Arc::new(signaling.clone()));
        Self {
            signaling,
            relay,
            bridge,
        }
    }
}

pub fn app_router(state: Arc<AppState>, config: &ServerConfig) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health_handler))
        .route("/bridge/stats", get(stats_handler))
        .route("/bridge/{stream_id}", delete(cleanup_handler))
        .route("/bridge/{stream_id}/offer", post(offer_handler))
        .route("/bridge/{stream_id}/ice-candidate", post(ice_candidate_handler))
        .route("/bridge/{stream_id}/status", get(status_handler))
        .route("/bridge/{stream_id}/events", get(events_handler))
        .layer(cors_layer(config))
        .with_state(state)
}

async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if config.allows_any_origin() {
        return cors.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin.trim()) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Ignoring invalid origin '{}': {}", origin, e);
                None
            }
        })
        .collect();
    cors.allow_origin(AllowOrigin::list(origins))
}
