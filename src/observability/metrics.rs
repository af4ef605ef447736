//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by method, status
//! - `gateway_requests_rejected_total` (counter): gate rejections by reason
//! - `gateway_active_connections` (gauge): current connection count
//! - `gateway_ready` (gauge): 1=ready, 0=not ready
//! - `gateway_datastore_available` (gauge): 1=last ping ok, 0=failed
//! - `gateway_migration_failures_total` (counter): failed startup migrations
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed (tests, embedding)
//! - Exposition goes through the Prometheus handle at `/metrics`

use axum::{extract::State, http::header, response::IntoResponse};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Why a gate refused a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    NotReady,
    Unauthorized,
    ProxyUnavailable,
}

impl Rejection {
    fn as_str(self) -> &'static str {
        match self {
            Rejection::NotReady => "not_ready",
            Rejection::Unauthorized => "unauthorized",
            Rejection::ProxyUnavailable => "proxy_unavailable",
        }
    }
}

/// Install the global Prometheus recorder.
pub fn init_metrics() -> Result<PrometheusHandle, metrics_exporter_prometheus::BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    tracing::info!("Prometheus recorder installed");
    Ok(handle)
}

pub fn record_request(method: &str, status: u16) {
    metrics::counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

pub fn record_rejection(reason: Rejection) {
    metrics::counter!("gateway_requests_rejected_total", "reason" => reason.as_str()).increment(1);
}

pub fn record_connections(active: u64) {
    metrics::gauge!("gateway_active_connections").set(active as f64);
}

pub fn record_ready(ready: bool) {
    metrics::gauge!("gateway_ready").set(if ready { 1.0 } else { 0.0 });
}

pub fn record_datastore_available(available: bool) {
    metrics::gauge!("gateway_datastore_available").set(if available { 1.0 } else { 0.0 });
}

pub fn record_migration_failure() {
    metrics::counter!("gateway_migration_failures_total").increment(1);
}

/// `GET /metrics`
pub async fn metrics_handler(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        handle.render(),
    )
}
