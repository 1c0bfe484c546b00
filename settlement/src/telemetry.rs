//! Scrape endpoint
//!
//! `GET /metrics` returns the host's collectors in the Prometheus text
//! format; `GET /health` reports the service name and version.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use supply_ledger_core::Metrics;
use tokio::net::TcpListener;

/// Shared state of the scrape endpoint
#[derive(Clone, Debug)]
pub struct TelemetryState {
    metrics: Metrics,
    service: Arc<ServiceInfo>,
}

/// Body of `GET /health`
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ServiceInfo {
    /// Always `"ok"` while the endpoint answers
    pub status: String,
    /// Service name
    pub service: String,
    /// Service version
    pub version: String,
}

impl TelemetryState {
    /// Create state over the collectors the executor records into
    pub fn new(
        metrics: Metrics,
        service_name: impl Into<String>,
        service_version: impl Into<String>,
    ) -> Self {
        Self {
            metrics,
            service: Arc::new(ServiceInfo {
                status: "ok".to_string(),
                service: service_name.into(),
                version: service_version.into(),
            }),
        }
    }
}

/// Handler for `GET /metrics`
pub async fn metrics_handler(State(state): State<TelemetryState>) -> Response {
    match state.metrics.export() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(err) => {
            tracing::error!(error = %err, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {}", err),
            )
                .into_response()
        }
    }
}

/// Handler for `GET /health`
pub async fn health_handler(State(state): State<TelemetryState>) -> Json<ServiceInfo> {
    Json(state.service.as_ref().clone())
}

/// Router exposing `/metrics` and `/health`
pub fn router(state: TelemetryState) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

/// Bind `addr` and serve the scrape endpoint until the task is dropped
pub async fn serve(addr: &str, state: TelemetryState) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "Metrics endpoint listening");
    axum::serve(listener, router(state)).await
}
