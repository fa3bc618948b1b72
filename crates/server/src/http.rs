//! HTTP Endpoints
//!
//! Health, metrics, the caller audio WebSocket and the call admin API.

use axum::{
    extract::{Json, Path, State},
    http::{HeaderValue, Method, StatusCode},
    routing::get,
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::metrics::metrics_handler;
use crate::state::AppState;
use crate::websocket::audio_ws_handler;
use crate::ServerError;

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let cors_layer = build_cors_layer(
        &state.config.server.cors_origins,
        state.config.server.cors_enabled,
    );

    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .route("/ws/audio", get(audio_ws_handler))
        .route("/api/calls", get(list_calls))
        .route("/api/calls/:id", get(get_call).delete(hangup_call))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
}

const LOCAL_ORIGIN: &str = "http://localhost:3000";

/// Build the CORS layer from configured origins
///
/// Disabled means permissive. An empty or fully invalid origin list falls
/// back to the local dashboard origin.
fn build_cors_layer(origins: &[String], enabled: bool) -> CorsLayer {
    if !enabled {
        tracing::warn!("CORS is disabled - allowing all origins");
        return CorsLayer::permissive();
    }

    let parsed_origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                tracing::warn!("Invalid CORS origin: {}", origin);
                None
            })
        })
        .collect();

    if parsed_origins.is_empty() {
        tracing::info!("No usable CORS origins configured, defaulting to {}", LOCAL_ORIGIN);
        return CorsLayer::new()
            .allow_origin(HeaderValue::from_static(LOCAL_ORIGIN))
            .allow_methods([Method::GET, Method::DELETE, Method::OPTIONS])
            .allow_headers(Any);
    }

    tracing::info!("CORS configured with {} origins", parsed_origins.len());
    CorsLayer::new()
        .allow_origin(parsed_origins)
        .allow_methods([Method::GET, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any)
}

async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    let services = state.calls.services();

    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": state.started_at.elapsed().as_secs(),
        "active_calls": state.calls.active_count(),
        "services": {
            "recognition": services.recognizer.name(),
            "recognition_mode": format!("{:?}", services.recognizer.mode()).to_lowercase(),
            "synthesis": services.synthesizer.name(),
            "dialogue": services.dialogue.name(),
            "telephony": services.telephony.is_enabled(),
        },
    }))
}

async fn list_calls(State(state): State<AppState>) -> Json<serde_json::Value> {
    let calls = state.calls.list();
    Json(serde_json::json!({
        "count": calls.len(),
        "calls": calls,
    }))
}

/// Call info, plus the switch's channel variables when telephony is enabled
async fn get_call(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let session = state
        .calls
        .get(&id)
        .ok_or_else(|| ServerError::CallNotFound(id.clone()))?;

    let telephony = &state.calls.services().telephony;
    let channel = if telephony.is_enabled() {
        match telephony.channel_info(&id).await {
            Ok(vars) => Some(vars),
            Err(e) => {
                tracing::warn!(call_id = %id, error = %e, "Channel dump failed");
                None
            }
        }
    } else {
        None
    };

    Ok(Json(serde_json::json!({
        "call": session.info(),
        "channel": channel,
    })))
}

/// Hang up on the switch and end the session
async fn hangup_call(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ServerError> {
    state.calls.hangup(&id).await?;
    tracing::info!(call_id = %id, "Call hung up via admin API");
    Ok(StatusCode::NO_CONTENT)
}
