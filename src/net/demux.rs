//! Per-request protocol demultiplexing.
//!
//! gRPC and plain HTTP share one plain-text port. Before any application logic
//! runs, each request is dispatched on two facts only:
//!
//! | HTTP version | Content-Type         | Target     |
//! |--------------|----------------------|------------|
//! | HTTP/2       | `application/grpc*`  | gRPC       |
//! | HTTP/2       | anything else        | HTTP chain |
//! | HTTP/1.x     | anything             | HTTP chain |
//!
//! The path is never consulted; path routing belongs to the HTTP chain.

use axum::body::{Body, Bytes, HttpBody};
use axum::http::{header, Request, Version};
use axum::response::Response;
use axum::Router;
use std::convert::Infallible;
use std::task::{Context, Poll};
use tower::util::Oneshot;
use tower::{BoxError, Service, ServiceExt};

/// Where a request is dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Grpc,
    Http,
}

/// Classify a request by protocol version and content type.
pub fn classify<B>(request: &Request<B>) -> Protocol {
    let grpc_typed = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(is_grpc_content_type);

    if request.version() == Version::HTTP_2 && grpc_typed {
        Protocol::Grpc
    } else {
        Protocol::Http
    }
}

/// `application/grpc`, optionally followed by `+codec` or `;params`.
fn is_grpc_content_type(value: &str) -> bool {
    const GRPC: &str = "application/grpc";

    let Some(prefix) = value.get(..GRPC.len()) else {
        return false;
    };
    if !prefix.eq_ignore_ascii_case(GRPC) {
        return false;
    }
    matches!(value.as_bytes().get(GRPC.len()), None | Some(b'+') | Some(b';'))
}

/// Dispatches each request to the gRPC routes or the HTTP chain.
#[derive(Clone)]
pub struct ProtocolDemux {
    grpc: Router,
    http: Router,
}

impl ProtocolDemux {
    pub fn new(grpc: Router, http: Router) -> Self {
        Self { grpc, http }
    }
}

impl<B> Service<Request<B>> for ProtocolDemux
where
    B: HttpBody<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    type Response = Response;
    type Error = Infallible;
    type Future = Oneshot<Router, Request<Body>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request<B>) -> Self::Future {
        let target = match classify(&request) {
            Protocol::Grpc => self.grpc.clone(),
            Protocol::Http => self.http.clone(),
        };
        target.oneshot(request.map(Body::new))
    }
}
