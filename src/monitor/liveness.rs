//! Liveness self-check loop.
//!
//! # Responsibilities
//! - Periodically confirm the runtime still schedules work
//! - Own the `live` flag
//!
//! # Design Decisions
//! - Consecutive failures up to the threshold are tolerated
//! - Crossing the threshold latches `live=false` for the rest of the process;
//!   the orchestrator is expected to restart it
//! - Cancellation clears `live` on the way out

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::health::HealthState;

/// A self-check that reports whether the process is still functioning.
#[async_trait]
pub trait LivenessProbe: Send + Sync + 'static {
    async fn check(&self) -> bool;
}

/// Spawns a no-op task and requires the runtime to run it within `timeout`.
#[derive(Debug, Clone)]
pub struct RuntimeProbe {
    timeout: Duration,
}

impl RuntimeProbe {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl LivenessProbe for RuntimeProbe {
    async fn check(&self) -> bool {
        matches!(time::timeout(self.timeout, tokio::spawn(async {})).await, Ok(Ok(())))
    }
}

pub struct LivenessMonitor<P = RuntimeProbe> {
    health: Arc<HealthState>,
    probe: P,
    interval: Duration,
    failure_threshold: u32,
}

impl<P: LivenessProbe> LivenessMonitor<P> {
    pub fn new(health: Arc<HealthState>, probe: P, interval: Duration, failure_threshold: u32) -> Self {
        Self {
            health,
            probe,
            interval,
            failure_threshold: failure_threshold.max(1),
        }
    }

    pub async fn run(self, shutdown: CancellationToken) {
        tracing::info!(interval = ?self.interval, "Liveness monitor starting");

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut failures = 0u32;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    self.health.set_live(false);
                    tracing::info!("Liveness monitor received shutdown signal, exiting loop");
                    return;
                }
                _ = ticker.tick() => {}
            }

            if self.probe.check().await {
                if failures > 0 {
                    tracing::info!(failures, "Liveness self-check recovered");
                }
                failures = 0;
                self.health.set_live(true);
                continue;
            }

            failures += 1;
            tracing::warn!(failures, threshold = self.failure_threshold, "Liveness self-check failed");
            if failures >= self.failure_threshold {
                self.health.set_live(false);
                tracing::error!(
                    failures,
                    "Liveness lost; process requires restart"
                );
                return;
            }
        }
    }
}
