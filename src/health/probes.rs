//! Orchestrator probe endpoints.
//!
//! Probes are never gated by readiness or authentication: an orchestrator must be
//! able to observe recovery while the service is not ready.

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use std::sync::Arc;

use crate::health::state::{HealthSnapshot, HealthState};

/// Router serving `/probe/startup`, `/probe/live` and `/probe/ready`.
pub fn probe_router(health: Arc<HealthState>) -> Router {
    Router::new()
        .route("/probe/startup", get(startup))
        .route("/probe/live", get(live))
        .route("/probe/ready", get(ready))
        .with_state(health)
}

fn respond(ok: bool, snapshot: HealthSnapshot) -> (StatusCode, Json<HealthSnapshot>) {
    let status = if ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(snapshot))
}

async fn startup(State(health): State<Arc<HealthState>>) -> (StatusCode, Json<HealthSnapshot>) {
    let snapshot = health.snapshot();
    respond(snapshot.live, snapshot)
}

async fn live(State(health): State<Arc<HealthState>>) -> (StatusCode, Json<HealthSnapshot>) {
    let snapshot = health.snapshot();
    respond(snapshot.live, snapshot)
}

async fn ready(State(health): State<Arc<HealthState>>) -> (StatusCode, Json<HealthSnapshot>) {
    let snapshot = health.snapshot();
    respond(snapshot.ready, snapshot)
}
