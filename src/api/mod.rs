//! Example collaborator API mounted under `/api`.
//!
//! Everything here sits behind the audit logger and the readiness gate.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;

use crate::health::{HealthSnapshot, HealthState};

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub service: &'static str,
    pub version: &'static str,
    pub health: HealthSnapshot,
}

/// `GET /v1/status`
pub fn api_router(health: Arc<HealthState>) -> Router {
    Router::new()
        .route("/v1/status", get(status))
        .with_state(health)
}

async fn status(State(health): State<Arc<HealthState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        health: health.snapshot(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, http::StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn reports_snapshot() {
        let health = Arc::new(HealthState::new());
        health.set_ready(true);

        let response = api_router(health)
            .oneshot(Request::get("/v1/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["service"], "gateway-server");
        assert_eq!(json["health"]["ready"], true);
        assert_eq!(json["health"]["live"], false);
    }
}
