//! Audit logging middleware.
//!
//! Runs before any gate so that rejected requests are still observable.

use axum::{
    body::Body,
    http::{Request, Uri},
    middleware::Next,
    response::Response,
};

use crate::http::X_REQUEST_ID;
use crate::observability::metrics;

/// Log method and credential-redacted URL, then pass the request through unchanged.
pub async fn audit_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let request_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    tracing::info!(
        request_id = %request_id,
        method = %method,
        url = %redact_uri(request.uri()),
        "request"
    );

    let response = next.run(request).await;
    metrics::record_request(method.as_str(), response.status().as_u16());
    response
}

/// Render `uri` with any userinfo password replaced by `xxxxx`.
pub fn redact_uri(uri: &Uri) -> String {
    let Some(authority) = uri.authority() else {
        return uri.to_string();
    };
    let Some((userinfo, host)) = authority.as_str().rsplit_once('@') else {
        return uri.to_string();
    };
    let Some((user, _password)) = userinfo.split_once(':') else {
        return uri.to_string();
    };

    let scheme = uri
        .scheme_str()
        .map(|scheme| format!("{scheme}://"))
        .unwrap_or_default();
    let path = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("");
    format!("{scheme}{user}:xxxxx@{host}{path}")
}
