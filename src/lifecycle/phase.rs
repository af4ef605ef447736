//! Lifecycle phase tracking.
//!
//! # State Transitions
//! ```text
//! Starting → Listening → Migrating → Serving → ShuttingDown → Closed
//!     └──────────┴───────────┴──→ Failed
//! ```
//!
//! Closed and Failed are terminal: later transitions are ignored.

use std::fmt;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Starting,
    Listening,
    Migrating,
    Serving,
    ShuttingDown,
    Closed,
    Failed,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Closed | Phase::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Starting => "starting",
            Phase::Listening => "listening",
            Phase::Migrating => "migrating",
            Phase::Serving => "serving",
            Phase::ShuttingDown => "shutting-down",
            Phase::Closed => "closed",
            Phase::Failed => "failed",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Publishes the current phase to any number of observers.
#[derive(Debug, Clone)]
pub struct PhaseTracker {
    tx: watch::Sender<Phase>,
}

impl PhaseTracker {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(Phase::Starting);
        Self { tx }
    }

    pub fn current(&self) -> Phase {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Phase> {
        self.tx.subscribe()
    }

    /// Move to `next` unless the current phase is terminal. Returns whether it moved.
    pub fn advance(&self, next: Phase) -> bool {
        let moved = self.tx.send_if_modified(|phase| {
            if phase.is_terminal() || *phase == next {
                return false;
            }
            *phase = next;
            true
        });
        if moved {
            tracing::info!(phase = %next, "Lifecycle phase changed");
        }
        moved
    }
}

impl Default for PhaseTracker {
    fn default() -> Self {
        Self::new()
    }
}
