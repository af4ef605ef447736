//! HTTP chain assembly and the shared-port accept loop.
//!
//! # Responsibilities
//! - Compose the HTTP route table with its gates
//! - Wrap every HTTP request in tracing, request ID, timeout and body limit layers
//! - Serve gRPC and HTTP on one plain-text port (HTTP/1.1 and h2c)
//! - Hand every accepted connection to a [`ConnectionSet`] for draining
//!
//! HTTP/2 without TLS is accepted with prior knowledge only. The HTTP/1.1
//! `Upgrade: h2c` handshake is not supported; such requests are answered
//! over HTTP/1.1.
//!
//! # Route table
//! ```text
//! /probe/{startup,live,ready}   unauthenticated probes
//! /api/*                        collaborator API: audit → readiness (prefix stripped)
//! /static/*, /favicon.ico       static assets (embedded, or `assets.dir`)
//! /metrics                      Prometheus exposition (when enabled)
//! <mount>/*                     reverse proxy: audit
//! anything else                 basic auth → 404
//! ```

use axum::{
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::get,
    Router,
};
use hyper_util::{
    rt::{TokioExecutor, TokioIo},
    server::conn::auto::Builder as ConnBuilder,
    service::TowerToHyperService,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::GatewayConfig;
use crate::health::{probe_router, HealthState};
use crate::http::assets::assets_router;
use crate::http::middleware::{
    audit_middleware, basic_auth_middleware, readiness_middleware, BasicAuth,
};
use crate::http::proxy::proxy_router;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::net::{ConnectionSet, Listener, ListenerError, ProtocolDemux};
use crate::observability::metrics::metrics_handler;

/// Build the HTTP chain.
///
/// `api` is mounted under `/api` with the prefix stripped. `metrics` enables
/// `/metrics` when present.
pub fn build_http_router(
    config: &GatewayConfig,
    health: Arc<HealthState>,
    api: Router,
    metrics: Option<PrometheusHandle>,
) -> Router {
    let gated_api = ServiceBuilder::new()
        .layer(middleware::from_fn(audit_middleware))
        .layer(middleware::from_fn_with_state(
            Arc::clone(&health),
            readiness_middleware,
        ))
        .service(api);

    let auth = Arc::new(BasicAuth::new(
        &config.auth.basic_auth_user,
        &config.auth.basic_auth_password,
    ));
    let root = ServiceBuilder::new()
        .layer(middleware::from_fn_with_state(auth, basic_auth_middleware))
        .service(Router::new().fallback(not_found));

    let proxy = proxy_router(&config.reverse_proxy).layer(middleware::from_fn(audit_middleware));

    let mut router = Router::new()
        .merge(probe_router(health))
        .nest_service("/api", gated_api)
        .merge(assets_router(config.assets.dir.as_deref()))
        .merge(proxy);

    if let Some(handle) = metrics {
        router = router.route("/metrics", get(metrics_handler).with_state(handle));
    }

    router
        .fallback_service(root)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(config.timeouts.request_secs),
        ))
        .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
        .layer(TraceLayer::new_for_http())
        .layer(propagate_request_id_layer())
        .layer(set_request_id_layer())
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "Not Found")
}

/// Serves one [`ProtocolDemux`] on a listener.
pub struct HttpServer {
    demux: ProtocolDemux,
}

impl HttpServer {
    pub fn new(grpc: Router, http: Router) -> Self {
        Self {
            demux: ProtocolDemux::new(grpc, http),
        }
    }

    /// Accept until `shutdown` fires or the listener fails terminally.
    ///
    /// The listener is closed on return. Open connections are handed back
    /// undrained along with the reason the loop ended.
    pub async fn serve(
        self,
        listener: Listener,
        shutdown: CancellationToken,
    ) -> (ConnectionSet, Result<(), ListenerError>) {
        let builder = ConnBuilder::new(TokioExecutor::new());
        let mut connections = ConnectionSet::new();

        if let Ok(addr) = listener.local_addr() {
            tracing::info!(address = %addr, max_connections = listener.max_connections(), "HTTP server starting");
        }

        let result = loop {
            let accepted = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break Ok(()),
                accepted = listener.accept() => accepted,
            };

            match accepted {
                Ok((stream, peer, permit)) => {
                    let service = TowerToHyperService::new(self.demux.clone());
                    let conn = builder
                        .serve_connection(TokioIo::new(stream), service)
                        .into_owned();
                    connections.spawn(conn, peer, permit);
                }
                Err(e) if e.is_transient() => {
                    tracing::debug!(error = %e, "Accept failed, continuing");
                }
                Err(e) => {
                    tracing::error!(error = %e, "Listener failed");
                    break Err(e);
                }
            }
        };

        drop(listener);
        tracing::info!(
            open_connections = connections.tracker().active_count(),
            "HTTP server stopped accepting"
        );
        (connections, result)
    }
}
