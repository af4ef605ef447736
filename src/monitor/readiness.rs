//! Readiness derivation loop.
//!
//! `ready = listener_available AND datastore_available`, recomputed on every tick.
//! Readiness therefore lags a dependency transition by at most one interval.
//! Cancellation clears `ready` so draining connections are gated too.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tonic_health::server::HealthReporter;
use tonic_health::ServingStatus;

use crate::health::HealthState;
use crate::observability::metrics;

pub struct ReadinessMonitor {
    health: Arc<HealthState>,
    interval: Duration,
    reporter: Option<HealthReporter>,
}

impl ReadinessMonitor {
    pub fn new(health: Arc<HealthState>, interval: Duration) -> Self {
        Self {
            health,
            interval,
            reporter: None,
        }
    }

    /// Mirror readiness into the `grpc.health.v1.Health` service (overall status "").
    pub fn with_grpc_reporter(mut self, reporter: HealthReporter) -> Self {
        self.reporter = Some(reporter);
        self
    }

    pub async fn run(mut self, shutdown: CancellationToken) {
        tracing::info!(interval = ?self.interval, "Readiness monitor starting");

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last: Option<bool> = None;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("Readiness monitor received shutdown signal, exiting loop");
                    self.health.set_ready(false);
                    metrics::record_ready(false);
                    return;
                }
                _ = ticker.tick() => {}
            }

            let ready = derive_ready(&self.health);
            self.health.set_ready(ready);
            metrics::record_ready(ready);

            if last == Some(ready) {
                continue;
            }
            last = Some(ready);

            if ready {
                tracing::info!("Service ready");
            } else {
                tracing::warn!(
                    listener_available = self.health.is_listener_available(),
                    datastore_available = self.health.is_datastore_available(),
                    "Service not ready"
                );
            }

            if let Some(reporter) = self.reporter.as_mut() {
                let status = if ready {
                    ServingStatus::Serving
                } else {
                    ServingStatus::NotServing
                };
                reporter.set_service_status("", status).await;
            }
        }
    }
}

fn derive_ready(health: &HealthState) -> bool {
    health.is_listener_available() && health.is_datastore_available()
}
