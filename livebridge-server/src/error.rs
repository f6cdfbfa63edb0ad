use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// Failures surfaced by the bridge (HTTP-facing) side of the server.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// Missing or malformed request fields.
    #[error("{0}")]
    Validation(String),

    /// Unknown stream.
    #[error("stream not found: {0}")]
    NotFound(String),

    /// The native media engine is not available in this process.
    #[error("media engine unavailable: {0}")]
    DependencyUnavailable(String),

    /// The transcoder could not be started or died.
    #[error("transcode process failed: {0}")]
    ExternalProcess(String),

    /// The engine rejected a description or candidate.
    #[error("negotiation failed: {0}")]
    Negotiation(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            BridgeError::Validation(_) => StatusCode::BAD_REQUEST,
            BridgeError::NotFound(_) => StatusCode::NOT_FOUND,
            BridgeError::DependencyUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            BridgeError::ExternalProcess(_)
            | BridgeError::Negotiation(_)
            | BridgeError::Internal(_)
            | BridgeError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn category(&self) -> &'static str {
        match self {
            BridgeError::Validation(_) => "validation_error",
            BridgeError::NotFound(_) => "not_found",
            BridgeError::DependencyUnavailable(_) => "dependency_unavailable",
            BridgeError::ExternalProcess(_) => "external_process_failure",
            BridgeError::Negotiation(_) => "negotiation_failed",
            BridgeError::Internal(_) | BridgeError::Io(_) => "internal_error",
        }
    }
}

impl IntoResponse for BridgeError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.category(),
            "message": self.to_string(),
        }));
        (self.status_code(), body).into_response()
    }
}

/// Failures returned to the originating signaling connection only.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignalingError {
    #[error("{0}")]
    Validation(String),
}

pub type BridgeResult<T> = std::result::Result<T, BridgeError>;
