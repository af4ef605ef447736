//! Background monitors driving the health flags.
//!
//! # Data Flow
//! ```text
//! liveness.rs   : timer → runtime self-check   → live
//! datastore.rs  : timer → Datastore::ping()    → datastore_available
//! readiness.rs  : timer → listener ∧ datastore → ready (+ grpc.health.v1)
//! ```
//!
//! # Design Decisions
//! - Each monitor owns exactly one flag, so writes are never contended
//! - Every loop exits on the shared cancellation token; shutdown never joins them
//! - No ordering between monitors: `ready` may be stale by one interval

pub mod datastore;
pub mod liveness;
pub mod readiness;

pub use datastore::DatastoreMonitor;
pub use liveness::{LivenessMonitor, LivenessProbe, RuntimeProbe};
pub use readiness::ReadinessMonitor;
