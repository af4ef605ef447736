//! Readiness gate.
//!
//! Applied to the gateway subtree only. Probes and static assets stay reachable
//! while the service is not ready.

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::health::HealthState;
use crate::http::middleware::audit::redact_uri;
use crate::observability::{metrics, Rejection};

pub async fn readiness_middleware(
    State(health): State<Arc<HealthState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !health.is_ready() {
        tracing::info!(
            method = %request.method(),
            url = %redact_uri(request.uri()),
            "service called when not ready"
        );
        metrics::record_rejection(Rejection::NotReady);
        return (StatusCode::SERVICE_UNAVAILABLE, "service not ready").into_response();
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{middleware, routing::get, Router};
    use tower::ServiceExt;

    fn gated(health: Arc<HealthState>) -> Router {
        Router::new()
            .route("/items", get(|| async { "items" }))
            .layer(middleware::from_fn_with_state(health, readiness_middleware))
    }

    async fn call(router: Router) -> StatusCode {
        router
            .oneshot(Request::get("/items").body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn rejects_iff_not_ready() {
        let health = Arc::new(HealthState::new());
        let router = gated(Arc::clone(&health));

        assert_eq!(call(router.clone()).await, StatusCode::SERVICE_UNAVAILABLE);

        health.set_ready(true);
        assert_eq!(call(router.clone()).await, StatusCode::OK);

        health.set_ready(false);
        assert_eq!(call(router).await, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn rejection_body_explains() {
        let response = gated(Arc::new(HealthState::new()))
            .oneshot(Request::get("/items").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"service not ready");
    }
}
