//! Connection lifecycle tracking and draining.
//!
//! # Responsibilities
//! - Generate unique connection IDs for tracing
//! - Count open connections
//! - Own every connection task so shutdown can drain or abort them
//!
//! # Design Decisions
//! - Each connection is registered with hyper's graceful watcher: on drain,
//!   HTTP/1.1 finishes the in-flight response and closes, HTTP/2 sends GOAWAY
//! - The drain is bounded; on expiry the remaining tasks are aborted,
//!   which drops (force-closes) their sockets

use hyper_util::server::graceful::{GracefulConnection, GracefulShutdown};
use std::fmt::Display;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinSet;
use tokio::time;

use crate::net::listener::ConnectionPermit;
use crate::observability::metrics;

/// Global atomic counter for connection IDs.
/// Using relaxed ordering is sufficient since we only need uniqueness, not synchronization.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Tracks the number of open connections.
#[derive(Debug, Clone, Default)]
pub struct ConnectionTracker {
    active_count: Arc<AtomicU64>,
}

impl ConnectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new active connection. Returns a guard that decrements on drop.
    pub fn track(&self) -> ConnectionGuard {
        let active = self.active_count.fetch_add(1, Ordering::SeqCst) + 1;
        metrics::record_connections(active);
        ConnectionGuard {
            active_count: Arc::clone(&self.active_count),
            id: ConnectionId::new(),
        }
    }

    /// Get current active connection count.
    pub fn active_count(&self) -> u64 {
        self.active_count.load(Ordering::SeqCst)
    }
}

/// Guard that tracks a connection's lifetime.
/// Decrements active count when dropped.
#[derive(Debug)]
pub struct ConnectionGuard {
    active_count: Arc<AtomicU64>,
    id: ConnectionId,
}

impl ConnectionGuard {
    /// Get this connection's ID.
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        let active = self.active_count.fetch_sub(1, Ordering::SeqCst).saturating_sub(1);
        metrics::record_connections(active);
        tracing::trace!(connection_id = %self.id, "Connection closed");
    }
}

/// The drain deadline passed with connections still open.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("drain deadline of {deadline:?} exceeded; {remaining} connection(s) force-closed")]
pub struct DrainTimeout {
    pub deadline: Duration,
    pub remaining: u64,
}

/// Every connection task spawned by the accept loop.
pub struct ConnectionSet {
    graceful: GracefulShutdown,
    tasks: JoinSet<()>,
    tracker: ConnectionTracker,
}

impl ConnectionSet {
    pub fn new() -> Self {
        Self {
            graceful: GracefulShutdown::new(),
            tasks: JoinSet::new(),
            tracker: ConnectionTracker::new(),
        }
    }

    pub fn tracker(&self) -> &ConnectionTracker {
        &self.tracker
    }

    /// Drive `conn` on its own task until it completes, is drained, or is aborted.
    pub fn spawn<C>(&mut self, conn: C, peer: SocketAddr, permit: ConnectionPermit)
    where
        C: GracefulConnection + Send + 'static,
        C::Error: Display + Send,
    {
        let guard = self.tracker.track();
        let watched = self.graceful.watch(conn);

        self.tasks.spawn(async move {
            let _permit = permit;
            if let Err(e) = watched.await {
                tracing::debug!(connection_id = %guard.id(), peer_addr = %peer, error = %e, "Connection ended with error");
            }
            drop(guard);
        });

        // Reap finished tasks so the set does not grow with connection churn.
        while self.tasks.try_join_next().is_some() {}
    }

    /// Ask every connection to finish its in-flight work and close, waiting at most
    /// `deadline` before aborting whatever is left.
    pub async fn drain(self, deadline: Duration) -> Result<(), DrainTimeout> {
        let ConnectionSet {
            graceful,
            mut tasks,
            tracker,
        } = self;

        tracing::info!(
            open_connections = tracker.active_count(),
            deadline = ?deadline,
            "Draining connections"
        );

        let drained = time::timeout(deadline, async {
            graceful.shutdown().await;
            while tasks.join_next().await.is_some() {}
        })
        .await;

        match drained {
            Ok(()) => {
                tracing::info!("All connections drained");
                Ok(())
            }
            Err(_) => {
                let remaining = tracker.active_count();
                tasks.abort_all();
                while tasks.join_next().await.is_some() {}
                tracing::warn!(remaining, "Drain deadline exceeded, connections force-closed");
                Err(DrainTimeout { deadline, remaining })
            }
        }
    }
}

impl Default for ConnectionSet {
    fn default() -> Self {
        Self::new()
    }
}
