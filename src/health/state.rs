//! Process-wide health flags.
//!
//! # Flags
//! | Flag | Writer |
//! |---|---|
//! | live | liveness monitor |
//! | ready | readiness monitor |
//! | shutdown_requested | lifecycle coordinator (set once) |
//! | listener_available | lifecycle coordinator |
//! | datastore_available | datastore monitor |
//!
//! # Design Decisions
//! - One atomic per flag, no compound transactions across flags
//! - Any request path may read any flag without blocking a writer
//! - `ready` is derived elsewhere as `listener_available && datastore_available`

use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};

/// Independent health dimensions of the running process.
#[derive(Debug, Default)]
pub struct HealthState {
    live: AtomicBool,
    ready: AtomicBool,
    shutdown_requested: AtomicBool,
    listener_available: AtomicBool,
    datastore_available: AtomicBool,
}

/// Point-in-time copy of every flag, used for probe response bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HealthSnapshot {
    pub live: bool,
    pub ready: bool,
    pub shutdown_requested: bool,
    pub listener_available: bool,
    pub datastore_available: bool,
}

impl HealthState {
    /// All flags start false.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    pub fn set_live(&self, value: bool) {
        self.live.store(value, Ordering::Release);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub fn set_ready(&self, value: bool) {
        self.ready.store(value, Ordering::Release);
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_requested.load(Ordering::Acquire)
    }

    /// Flip `shutdown_requested` from false to true.
    ///
    /// Returns `true` only for the single caller that performed the transition.
    pub fn request_shutdown(&self) -> bool {
        self.shutdown_requested
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn is_listener_available(&self) -> bool {
        self.listener_available.load(Ordering::Acquire)
    }

    pub fn set_listener_available(&self, value: bool) {
        self.listener_available.store(value, Ordering::Release);
    }

    pub fn is_datastore_available(&self) -> bool {
        self.datastore_available.load(Ordering::Acquire)
    }

    pub fn set_datastore_available(&self, value: bool) {
        self.datastore_available.store(value, Ordering::Release);
    }

    pub fn snapshot(&self) -> HealthSnapshot {
        HealthSnapshot {
            live: self.is_live(),
            ready: self.is_ready(),
            shutdown_requested: self.is_shutdown_requested(),
            listener_available: self.is_listener_available(),
            datastore_available: self.is_datastore_available(),
        }
    }
}
