//! gRPC + HTTP gateway with a health-driven lifecycle.
//!
//! One plain-text port serves gRPC and HTTP (HTTP/1.1 and h2c). Background
//! monitors maintain a set of health flags; the flags drive the orchestrator
//! probes, the readiness gate and the gRPC health service.

// Core subsystems
pub mod config;
pub mod http;
pub mod grpc;
pub mod net;

// Health
pub mod health;
pub mod monitor;

// Collaborators
pub mod api;
pub mod datastore;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::GatewayConfig;
pub use health::HealthState;
pub use lifecycle::{Gateway, GatewayError, Phase, Shutdown};
