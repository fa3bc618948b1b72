//! Call Media Gateway Server
//!
//! Provides the caller audio WebSocket, the call admin API, health and
//! Prometheus metrics endpoints.

pub mod http;
pub mod metrics;
pub mod state;
pub mod websocket;

pub use http::create_router;
pub use metrics::{init_metrics, metrics_handler};
pub use state::AppState;
pub use websocket::{audio_ws_handler, WsFrameSink, WsFrameSource};

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use media_gateway_agent::AgentError;
use thiserror::Error;

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Call not found: {0}")]
    CallNotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("WebSocket upgrade required")]
    UpgradeRequired,

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<AgentError> for ServerError {
    fn from(err: AgentError) -> Self {
        match err {
            AgentError::CallNotFound(id) => ServerError::CallNotFound(id),
            AgentError::ShuttingDown => ServerError::Unavailable(err.to_string()),
            other => ServerError::Internal(other.to_string()),
        }
    }
}

impl From<ServerError> for StatusCode {
    fn from(err: ServerError) -> Self {
        StatusCode::from(&err)
    }
}

impl From<&ServerError> for StatusCode {
    fn from(err: &ServerError) -> Self {
        match err {
            ServerError::CallNotFound(_) => StatusCode::NOT_FOUND,
            ServerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::UpgradeRequired => StatusCode::UPGRADE_REQUIRED,
            ServerError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = StatusCode::from(&self);
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
