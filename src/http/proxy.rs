//! Single-upstream reverse proxy mounted under a path prefix.
//!
//! # Rewriting
//! - Scheme and authority come from the upstream URL
//! - Path is the upstream base path joined to the full inbound path with exactly one slash
//! - Query strings are merged, upstream first
//! - `Host` is rewritten to the upstream authority
//!
//! Hop-by-hop headers are stripped in both directions. A missing or broken
//! upstream answers 502; it never takes the process down.

use axum::{
    body::Body,
    extract::State,
    http::{
        header::{self, HeaderName, InvalidHeaderValue},
        uri::{Authority, Scheme},
        HeaderMap, HeaderValue, Request, StatusCode, Uri, Version,
    },
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::sync::Arc;
use thiserror::Error;
use url::Url;

use crate::config::ReverseProxyConfig;
use crate::http::X_REQUEST_ID;
use crate::observability::{metrics, Rejection};

const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "proxy-connection",
    "te",
    "trailer",
    "upgrade",
];

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("upstream url {url:?} is invalid: {reason}")]
    InvalidUpstream { url: String, reason: &'static str },

    #[error("failed to build upstream uri: {0}")]
    Uri(#[from] axum::http::Error),

    #[error("invalid upstream host header: {0}")]
    Host(#[from] InvalidHeaderValue),

    #[error("upstream request failed: {0}")]
    Upstream(#[from] hyper_util::client::legacy::Error),
}

/// Forwards requests to one fixed upstream.
#[derive(Clone)]
pub struct ReverseProxy {
    authority: Authority,
    base_path: String,
    base_query: Option<String>,
    client: Client<HttpConnector, Body>,
}

impl ReverseProxy {
    pub fn new(raw_url: &str) -> Result<Self, ProxyError> {
        let invalid = |reason| ProxyError::InvalidUpstream {
            url: raw_url.to_string(),
            reason,
        };

        let url = Url::parse(raw_url).map_err(|_| invalid("not a url"))?;
        if url.scheme() != "http" {
            return Err(invalid("scheme must be http"));
        }
        let host = url.host_str().ok_or_else(|| invalid("missing host"))?;
        let authority = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };
        let authority = authority
            .parse::<Authority>()
            .map_err(|_| invalid("bad authority"))?;

        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        Ok(Self {
            authority,
            base_path: url.path().to_string(),
            base_query: url.query().filter(|q| !q.is_empty()).map(str::to_string),
            client,
        })
    }

    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    /// Map an inbound URI onto the upstream.
    pub fn rewrite(&self, inbound: &Uri) -> Result<Uri, ProxyError> {
        let path = join_path(&self.base_path, inbound.path());
        let path_and_query = match merge_query(self.base_query.as_deref(), inbound.query()) {
            Some(query) => format!("{path}?{query}"),
            None => path,
        };

        Ok(Uri::builder()
            .scheme(Scheme::HTTP)
            .authority(self.authority.clone())
            .path_and_query(path_and_query)
            .build()?)
    }

    pub async fn forward(&self, request: Request<Body>) -> Result<Response, ProxyError> {
        let (mut parts, body) = request.into_parts();

        parts.uri = self.rewrite(&parts.uri)?;
        parts.version = Version::HTTP_11;
        strip_hop_by_hop(&mut parts.headers);
        parts
            .headers
            .insert(header::HOST, HeaderValue::from_str(self.authority.as_str())?);

        let response = self.client.request(Request::from_parts(parts, body)).await?;

        let (mut parts, body) = response.into_parts();
        strip_hop_by_hop(&mut parts.headers);
        Ok(Response::from_parts(parts, Body::new(body)))
    }
}

/// Join two paths with exactly one slash between them.
pub fn join_path(base: &str, path: &str) -> String {
    match (base.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{}{}", base, &path[1..]),
        (false, false) => format!("{base}/{path}"),
        _ => format!("{base}{path}"),
    }
}

fn merge_query(base: Option<&str>, inbound: Option<&str>) -> Option<String> {
    match (base, inbound.filter(|q| !q.is_empty())) {
        (Some(base), Some(inbound)) => Some(format!("{base}&{inbound}")),
        (Some(only), None) | (None, Some(only)) => Some(only.to_string()),
        (None, None) => None,
    }
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in listed {
        headers.remove(name);
    }
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
    // Framing is re-established by the outbound connection.
    headers.remove(header::TRANSFER_ENCODING);
}

/// What the mount point forwards to.
pub enum ProxyTarget {
    Ready(ReverseProxy),
    Unavailable(String),
}

impl ProxyTarget {
    pub fn from_config(config: &ReverseProxyConfig) -> Self {
        match config.upstream_url.as_deref() {
            None => ProxyTarget::Unavailable("reverse_proxy.upstream_url is not set".to_string()),
            Some(raw) => match ReverseProxy::new(raw) {
                Ok(proxy) => ProxyTarget::Ready(proxy),
                Err(e) => ProxyTarget::Unavailable(e.to_string()),
            },
        }
    }
}

/// Routes for `mount`, `mount/` and everything below it.
pub fn proxy_router(config: &ReverseProxyConfig) -> Router {
    let mount = config.mount.trim_end_matches('/');
    let target = Arc::new(ProxyTarget::from_config(config));

    if let ProxyTarget::Unavailable(reason) = target.as_ref() {
        tracing::warn!(mount = %mount, reason = %reason, "Reverse proxy unavailable");
    }

    Router::new()
        .route(mount, any(proxy_handler))
        .route(&format!("{mount}/"), any(proxy_handler))
        .route(&format!("{mount}/{{*rest}}"), any(proxy_handler))
        .with_state(target)
}

async fn proxy_handler(State(target): State<Arc<ProxyTarget>>, request: Request<Body>) -> Response {
    let request_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let proxy = match target.as_ref() {
        ProxyTarget::Ready(proxy) => proxy,
        ProxyTarget::Unavailable(reason) => {
            tracing::error!(request_id = %request_id, reason = %reason, "Reverse proxy misconfigured");
            metrics::record_rejection(Rejection::ProxyUnavailable);
            return (StatusCode::BAD_GATEWAY, "Reverse proxy not configured").into_response();
        }
    };

    match proxy.forward(request).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(request_id = %request_id, upstream = %proxy.authority(), error = %e, "Upstream error");
            metrics::record_rejection(Rejection::ProxyUnavailable);
            (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;
    use tower::ServiceExt;

    fn config(upstream: Option<String>) -> ReverseProxyConfig {
        ReverseProxyConfig {
            mount: "/proxy".into(),
            upstream_url: upstream,
        }
    }

    #[test]
    fn joins_with_single_slash() {
        assert_eq!(join_path("/", "/proxy/a"), "/proxy/a");
        assert_eq!(join_path("/base/", "/proxy/a"), "/base/proxy/a");
        assert_eq!(join_path("/base", "/proxy/a"), "/base/proxy/a");
        assert_eq!(join_path("/base", "proxy"), "/base/proxy");
    }

    #[test]
    fn merges_queries_upstream_first() {
        assert_eq!(merge_query(Some("k=1"), Some("q=2")).as_deref(), Some("k=1&q=2"));
        assert_eq!(merge_query(None, Some("q=2")).as_deref(), Some("q=2"));
        assert_eq!(merge_query(Some("k=1"), None).as_deref(), Some("k=1"));
        assert_eq!(merge_query(Some("k=1"), Some("")).as_deref(), Some("k=1"));
        assert_eq!(merge_query(None, None), None);
    }

    #[test]
    fn rewrites_onto_upstream() {
        let proxy = ReverseProxy::new("http://backend:9000/base?k=1").unwrap();
        let inbound: Uri = "/proxy/items?page=2".parse().unwrap();
        assert_eq!(
            proxy.rewrite(&inbound).unwrap().to_string(),
            "http://backend:9000/base/proxy/items?k=1&page=2"
        );
    }

    #[test]
    fn rejects_unusable_upstreams() {
        assert!(ReverseProxy::new("not a url").is_err());
        assert!(ReverseProxy::new("https://secure.example").is_err());
    }

    #[test]
    fn strips_connection_listed_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONNECTION, "keep-alive, x-private".parse().unwrap());
        headers.insert("x-private", "1".parse().unwrap());
        headers.insert("x-public", "1".parse().unwrap());
        headers.insert(header::TE, "trailers".parse().unwrap());

        strip_hop_by_hop(&mut headers);
        assert!(headers.get("x-private").is_none());
        assert!(headers.get(header::TE).is_none());
        assert!(headers.get(header::CONNECTION).is_none());
        assert!(headers.get("x-public").is_some());
    }

    #[tokio::test]
    async fn unconfigured_upstream_is_bad_gateway() {
        let response = proxy_router(&config(None))
            .oneshot(Request::get("/proxy/anything").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn unreachable_upstream_is_bad_gateway() {
        // Bind then drop to obtain a port nothing listens on.
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };
        let response = proxy_router(&config(Some(format!("http://127.0.0.1:{port}"))))
            .oneshot(Request::get("/proxy/x").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn forwards_full_path_query_and_host() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let upstream = Router::new().fallback(|request: Request<Body>| async move {
            let host = request
                .headers()
                .get(header::HOST)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();
            format!("{} {}", host, request.uri())
        });
        tokio::spawn(async move {
            axum::serve(listener, upstream).await.unwrap();
        });

        let response = proxy_router(&config(Some(format!("http://{addr}/base?k=1"))))
            .oneshot(
                Request::get("/proxy/items?page=2")
                    .header(header::HOST, "gateway.local")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(
            String::from_utf8(body.to_vec()).unwrap(),
            format!("{addr} /base/proxy/items?k=1&page=2")
        );
    }
}
