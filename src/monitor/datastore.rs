//! Datastore health probing.
//!
//! # Responsibilities
//! - Periodically ping the datastore
//! - Own the `datastore_available` flag
//!
//! # Design Decisions
//! - Each ping is bounded by its own timeout
//! - Failures only flip the flag; the next successful ping restores it
//! - Only transitions are logged above debug, to keep steady state quiet

use std::sync::Arc;
use std::time::Duration;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::datastore::{Datastore, DatastoreError};
use crate::health::HealthState;
use crate::observability::metrics;

pub struct DatastoreMonitor<D> {
    health: Arc<HealthState>,
    datastore: Arc<D>,
    interval: Duration,
    ping_timeout: Duration,
}

impl<D: Datastore> DatastoreMonitor<D> {
    pub fn new(
        health: Arc<HealthState>,
        datastore: Arc<D>,
        interval: Duration,
        ping_timeout: Duration,
    ) -> Self {
        Self {
            health,
            datastore,
            interval,
            ping_timeout,
        }
    }

    pub async fn run(self, shutdown: CancellationToken) {
        tracing::info!(interval = ?self.interval, "Datastore monitor starting");

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("Datastore monitor received shutdown signal, exiting loop");
                    return;
                }
                _ = ticker.tick() => {}
            }

            let result = tokio::select! {
                _ = shutdown.cancelled() => return,
                result = self.ping() => result,
            };
            self.record(result);
        }
    }

    async fn ping(&self) -> Result<(), DatastoreError> {
        match time::timeout(self.ping_timeout, self.datastore.ping()).await {
            Ok(result) => result,
            Err(_) => Err(DatastoreError::Timeout),
        }
    }

    fn record(&self, result: Result<(), DatastoreError>) {
        let was_available = self.health.is_datastore_available();
        let available = result.is_ok();
        self.health.set_datastore_available(available);
        metrics::record_datastore_available(available);

        match result {
            Ok(()) if !was_available => tracing::info!("Datastore available"),
            Ok(()) => tracing::debug!("Datastore ping ok"),
            Err(e) if was_available => tracing::warn!(error = %e, "Datastore unavailable"),
            Err(e) => tracing::debug!(error = %e, "Datastore still unavailable"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct Switch(AtomicBool);

    #[async_trait]
    impl Datastore for Switch {
        async fn connect(&self) -> Result<(), DatastoreError> {
            Ok(())
        }

        async fn ping(&self) -> Result<(), DatastoreError> {
            if self.0.load(Ordering::SeqCst) {
                Ok(())
            } else {
                Err(DatastoreError::Other("down".into()))
            }
        }
    }

    struct Hanging;

    #[async_trait]
    impl Datastore for Hanging {
        async fn connect(&self) -> Result<(), DatastoreError> {
            Ok(())
        }

        async fn ping(&self) -> Result<(), DatastoreError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn flag_tracks_ping_outcome() {
        let health = Arc::new(HealthState::new());
        let store = Arc::new(Switch(AtomicBool::new(true)));
        let shutdown = CancellationToken::new();
        let interval = Duration::from_millis(10);
        let monitor = DatastoreMonitor::new(
            Arc::clone(&health),
            Arc::clone(&store),
            interval,
            Duration::from_millis(100),
        );
        let task = tokio::spawn(monitor.run(shutdown.clone()));

        tokio::time::sleep(interval * 3).await;
        assert!(health.is_datastore_available());

        store.0.store(false, Ordering::SeqCst);
        tokio::time::sleep(interval * 3).await;
        assert!(!health.is_datastore_available());

        store.0.store(true, Ordering::SeqCst);
        tokio::time::sleep(interval * 3).await;
        assert!(health.is_datastore_available());

        shutdown.cancel();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn hanging_ping_counts_as_failure() {
        let health = Arc::new(HealthState::new());
        health.set_datastore_available(true);
        let monitor = DatastoreMonitor::new(
            Arc::clone(&health),
            Arc::new(Hanging),
            Duration::from_millis(10),
            Duration::from_millis(20),
        );

        assert!(matches!(monitor.ping().await, Err(DatastoreError::Timeout)));
        monitor.record(Err(DatastoreError::Timeout));
        assert!(!health.is_datastore_available());
    }

    #[tokio::test]
    async fn exits_promptly_on_shutdown() {
        let shutdown = CancellationToken::new();
        let monitor = DatastoreMonitor::new(
            Arc::new(HealthState::new()),
            Arc::new(Hanging),
            Duration::from_millis(10),
            Duration::from_secs(60),
        );
        let task = tokio::spawn(monitor.run(shutdown.clone()));

        tokio::time::sleep(Duration::from_millis(30)).await;
        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("monitor exits while a ping is pending")
            .unwrap();
    }
}
