//! Application State
//!
//! Shared state across all handlers.

use std::sync::Arc;
use std::time::Instant;

use media_gateway_agent::{CallSessionManager, SessionServices};
use media_gateway_config::Settings;
use metrics_exporter_prometheus::PrometheusHandle;

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    /// Registry and lifecycle of active calls
    pub calls: Arc<CallSessionManager>,
    /// `None` when metrics are disabled
    pub metrics: Option<PrometheusHandle>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: Settings, services: SessionServices) -> Self {
        let calls = CallSessionManager::new(services, config.session.clone(), &config.playback);
        Self {
            config: Arc::new(config),
            calls: Arc::new(calls),
            metrics: None,
            started_at: Instant::now(),
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}
