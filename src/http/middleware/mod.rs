//! Request gates applied by the HTTP chain.
//!
//! Ordering on the gateway subtree is audit, then readiness. The root
//! catch-all is guarded by basic auth alone.

pub mod audit;
pub mod basic_auth;
pub mod readiness;

pub use audit::{audit_middleware, redact_uri};
pub use basic_auth::{basic_auth_middleware, BasicAuth};
pub use readiness::readiness_middleware;
