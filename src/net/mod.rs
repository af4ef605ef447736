//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop, connection limits)
//!     → connection.rs (lifecycle tracking, graceful drain)
//!     → hyper auto builder (HTTP/1.1 or h2c prior knowledge)
//!     → demux.rs (gRPC vs HTTP chain, per request)
//! ```
//!
//! # Design Decisions
//! - Bounded accept queue prevents resource exhaustion
//! - Each connection tracked for graceful shutdown
//! - No TLS: gRPC and HTTP/1.1 share the port through h2c

pub mod connection;
pub mod demux;
pub mod listener;

pub use connection::{ConnectionSet, ConnectionTracker, DrainTimeout};
pub use demux::{classify, Protocol, ProtocolDemux};
pub use listener::{Listener, ListenerError};
