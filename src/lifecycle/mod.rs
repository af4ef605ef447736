//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (coordinator.rs):
//!     Bind → spawn accept loop + monitors → connect datastore → migrate → serve
//!
//! Shutdown (shutdown.rs, coordinator.rs):
//!     Signal or listener failure → stop accepting → drain (bounded) → close datastore
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Phases (phase.rs):
//!     every transition published on a watch channel
//! ```
//!
//! # Design Decisions
//! - Ordered startup: the listener is bound before anything reports liveness
//! - Ordered shutdown: stop accept, drain, close
//! - Shutdown has a deadline: connections still open after it are force-closed

pub mod coordinator;
pub mod phase;
pub mod shutdown;
pub mod signals;

pub use coordinator::{Gateway, GatewayError};
pub use phase::{Phase, PhaseTracker};
pub use shutdown::Shutdown;
