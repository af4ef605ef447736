//! Shutdown coordination for the gateway.

use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

/// Coordinator for graceful shutdown.
///
/// A single process-wide cancellation signal observed by the accept loop, the
/// monitors and the drain. Triggering is idempotent and late subscribers still see
/// a signal that already fired.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    token: CancellationToken,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Token for a long-running task to observe.
    pub fn subscribe(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Trigger the shutdown signal.
    pub fn trigger(&self) {
        self.token.cancel();
    }

    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the signal has been triggered.
    pub fn triggered(&self) -> WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn late_subscriber_observes_trigger() {
        let shutdown = Shutdown::new();
        shutdown.trigger();
        shutdown.trigger();

        let token = shutdown.subscribe();
        tokio::time::timeout(Duration::from_millis(100), token.cancelled())
            .await
            .expect("already-cancelled token resolves immediately");
        assert!(shutdown.is_triggered());
    }

    #[tokio::test]
    async fn clones_share_the_signal() {
        let shutdown = Shutdown::new();
        let remote = shutdown.clone();

        let waiter = tokio::spawn(async move { remote.triggered().await });
        shutdown.trigger();
        waiter.await.unwrap();
    }
}
