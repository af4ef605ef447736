//! Health state subsystem.
//!
//! # Data Flow
//! ```text
//! Monitors / lifecycle coordinator
//!     → state.rs (atomic flags, one writer per flag)
//!
//! Orchestrator probes (probes.rs):
//!     GET /probe/{startup,live,ready}
//!     → read state.rs
//!     → 200 / 503 with a JSON snapshot
//!
//! Readiness gate (http::middleware):
//!     → reads `ready` only
//! ```

pub mod probes;
pub mod state;

pub use probes::probe_router;
pub use state::{HealthSnapshot, HealthState};
