//! HTTP side of the gateway.
//!
//! # Data Flow
//! ```text
//! TCP connection (HTTP/1.1 or h2c)
//!     → net::demux (gRPC or HTTP)
//!     → server.rs (request ID, trace, timeout, body limit)
//!     → route table
//!         /api/*  → middleware::audit → middleware::readiness → collaborator API
//!         /proxy  → middleware::audit → proxy.rs → upstream
//!         /static → assets.rs
//!         /       → middleware::basic_auth → 404
//! ```

pub mod assets;
pub mod middleware;
pub mod proxy;
pub mod request;
pub mod server;

pub use proxy::{ProxyError, ReverseProxy};
pub use request::X_REQUEST_ID;
pub use server::{build_http_router, HttpServer};
