//! Prometheus metrics
//!
//! The recorder is installed once at startup; the session crates record
//! through the `metrics` facade.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
};
use metrics::{counter, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::state::AppState;
use crate::ServerError;

/// Install the global Prometheus recorder
///
/// Fails if a recorder is already installed.
pub fn init_metrics() -> Result<PrometheusHandle, ServerError> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| ServerError::Internal(format!("prometheus recorder: {}", e)))?;

    register_default_metrics();
    Ok(handle)
}

/// Zero-valued series so dashboards see them before the first call
fn register_default_metrics() {
    gauge!("gateway_calls_active").set(0.0);
    counter!("gateway_calls_total").absolute(0);
    counter!("gateway_barge_in_total").absolute(0);
    counter!("gateway_playback_interrupted_total").absolute(0);
    counter!("gateway_dialogue_turns_total").absolute(0);
    counter!("gateway_dialogue_errors_total").absolute(0);
    counter!("gateway_audio_chunks_dropped_total").absolute(0);
    counter!("gateway_audio_chunks_silent_total").absolute(0);
    counter!("gateway_recognition_degraded_total").absolute(0);
}

/// GET /metrics
pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        ),
        None => (
            StatusCode::NOT_FOUND,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            "metrics disabled\n".to_string(),
        ),
    }
}
