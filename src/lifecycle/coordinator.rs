//! Startup ordering and the single shutdown sequence.
//!
//! # Phases
//! ```text
//! starting → listening → migrating → serving → shutting-down → closed
//!     └──────────┴──────────┴→ failed
//! ```
//!
//! # Design Decisions
//! - Bind first: `listener_available` is only ever set by a bound listener
//! - A failed migration leaves the service up in degraded mode
//! - Shutdown runs once, guarded by `HealthState::request_shutdown`
//! - The drain is bounded; leftovers are force-closed and reported as an error

use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinError;
use tonic::service::Routes;
use tonic_health::server::HealthReporter;
use tower_http::trace::TraceLayer;

use crate::config::GatewayConfig;
use crate::datastore::{Datastore, DatastoreError, Migrator};
use crate::health::HealthState;
use crate::http::{build_http_router, HttpServer};
use crate::lifecycle::phase::{Phase, PhaseTracker};
use crate::lifecycle::shutdown::Shutdown;
use crate::monitor::{DatastoreMonitor, LivenessMonitor, ReadinessMonitor, RuntimeProbe};
use crate::net::{ConnectionSet, DrainTimeout, Listener, ListenerError};
use crate::observability::metrics;

/// Errors that end [`Gateway::run`].
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("startup failed: {0}")]
    Bind(#[source] ListenerError),

    #[error("startup failed: datastore connect: {0}")]
    DatastoreConnect(#[source] DatastoreError),

    #[error("shutdown incomplete: {0}")]
    ShutdownTimeout(#[from] DrainTimeout),

    /// The accept loop died; its connections were never drained.
    #[error("shutdown incomplete: accept loop failed: {0}")]
    AcceptLoop(#[source] JoinError),
}

type AcceptOutcome = (ConnectionSet, Result<(), ListenerError>);

/// The gateway process: listener, monitors and collaborators.
pub struct Gateway<D, M> {
    config: GatewayConfig,
    health: Arc<HealthState>,
    phase: PhaseTracker,
    shutdown: Shutdown,
    datastore: Arc<D>,
    migrator: M,
    api: Router,
    grpc: Routes,
    grpc_reporter: Option<HealthReporter>,
    metrics: Option<PrometheusHandle>,
}

impl<D, M> Gateway<D, M>
where
    D: Datastore,
    M: Migrator<D>,
{
    pub fn new(config: GatewayConfig, datastore: Arc<D>, migrator: M) -> Self {
        Self {
            config,
            health: Arc::new(HealthState::new()),
            phase: PhaseTracker::new(),
            shutdown: Shutdown::new(),
            datastore,
            migrator,
            api: Router::new(),
            grpc: Routes::default(),
            grpc_reporter: None,
            metrics: None,
        }
    }

    /// Business API mounted under `/api`.
    pub fn with_api(mut self, api: Router) -> Self {
        self.api = api;
        self
    }

    pub fn with_grpc(mut self, routes: Routes) -> Self {
        self.grpc = routes;
        self
    }

    /// Mirror readiness into `grpc.health.v1`.
    pub fn with_grpc_reporter(mut self, reporter: HealthReporter) -> Self {
        self.grpc_reporter = Some(reporter);
        self
    }

    /// Serve `/metrics` from this handle.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Use an externally owned shutdown signal.
    pub fn with_shutdown(mut self, shutdown: Shutdown) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn health(&self) -> Arc<HealthState> {
        Arc::clone(&self.health)
    }

    pub fn phase(&self) -> watch::Receiver<Phase> {
        self.phase.subscribe()
    }

    pub fn shutdown(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Run until shutdown completes.
    pub async fn run(self) -> Result<(), GatewayError> {
        let Gateway {
            config,
            health,
            phase,
            shutdown,
            datastore,
            migrator,
            api,
            grpc,
            grpc_reporter,
            metrics: metrics_handle,
        } = self;
        let grace = config.lifecycle.shutdown_timeout();

        // starting → listening
        let listener = match Listener::bind(&config.listener).await {
            Ok(listener) => listener,
            Err(e) => {
                tracing::error!(error = %e, "Failed to bind listener");
                phase.advance(Phase::Failed);
                return Err(GatewayError::Bind(e));
            }
        };
        health.set_listener_available(true);
        phase.advance(Phase::Listening);

        let http = build_http_router(&config, Arc::clone(&health), api, metrics_handle);
        let grpc = grpc.into_axum_router().layer(TraceLayer::new_for_grpc());
        let server = HttpServer::new(grpc, http);
        let mut accept = tokio::spawn(server.serve(listener, shutdown.subscribe()));

        spawn_monitors(&config, &health, &datastore, grpc_reporter, &shutdown);

        // listening → migrating
        let connected = tokio::select! {
            result = datastore.connect() => Some(result),
            _ = shutdown.triggered() => None,
        };
        let connected = match connected {
            Some(Ok(())) => true,
            Some(Err(e)) => {
                tracing::error!(error = %e, "Datastore connect failed");
                phase.advance(Phase::Failed);
                health.set_listener_available(false);
                health.request_shutdown();
                shutdown.trigger();
                // The accept loop stops on the token; open connections get the usual grace.
                if let Err(drain_err) = drain(accept.await, grace).await {
                    tracing::warn!(error = %drain_err, "Connections force-closed after failed startup");
                }
                return Err(GatewayError::DatastoreConnect(e));
            }
            None => false,
        };

        // migrating → serving
        if connected {
            phase.advance(Phase::Migrating);
            let cancel = shutdown.subscribe();
            if let Err(e) = migrator.migrate(&cancel, &datastore).await {
                tracing::error!(error = %e, "Migration failed, continuing in degraded mode");
                metrics::record_migration_failure();
            }
        }
        if !shutdown.is_triggered() {
            phase.advance(Phase::Serving);
            tracing::info!(endpoint = %config.listener.endpoint(), "Gateway serving");
        }

        let joined = tokio::select! {
            _ = shutdown.triggered() => None,
            joined = &mut accept => Some(joined),
        };

        // serving → shutting-down
        health.set_listener_available(false);
        if !health.request_shutdown() {
            tracing::debug!("Shutdown already requested");
        }
        shutdown.trigger();
        phase.advance(Phase::ShuttingDown);
        tracing::info!(grace_period = ?grace, "Shutting down");

        let joined = match joined {
            Some(joined) => joined,
            None => accept.await,
        };
        let drained = drain(joined, grace).await;

        datastore.close().await;

        // shutting-down → closed
        phase.advance(Phase::Closed);
        match drained {
            Ok(()) => tracing::info!("Shutdown complete"),
            Err(ref e) => tracing::error!(error = %e, "Shutdown incomplete"),
        }
        drained
    }
}

fn spawn_monitors<D: Datastore>(
    config: &GatewayConfig,
    health: &Arc<HealthState>,
    datastore: &Arc<D>,
    grpc_reporter: Option<HealthReporter>,
    shutdown: &Shutdown,
) {
    let monitor = &config.monitor;

    let liveness = LivenessMonitor::new(
        Arc::clone(health),
        RuntimeProbe::new(monitor.liveness_timeout()),
        monitor.liveness_interval(),
        monitor.liveness_failure_threshold,
    );
    tokio::spawn(liveness.run(shutdown.subscribe()));

    let mut readiness = ReadinessMonitor::new(Arc::clone(health), monitor.readiness_interval());
    if let Some(reporter) = grpc_reporter {
        readiness = readiness.with_grpc_reporter(reporter);
    }
    tokio::spawn(readiness.run(shutdown.subscribe()));

    let store = DatastoreMonitor::new(
        Arc::clone(health),
        Arc::clone(datastore),
        monitor.datastore_interval(),
        config.datastore.ping_timeout(),
    );
    tokio::spawn(store.run(shutdown.subscribe()));
}

async fn drain(joined: Result<AcceptOutcome, JoinError>, grace: Duration) -> Result<(), GatewayError> {
    let (connections, accept_result) = joined.map_err(GatewayError::AcceptLoop)?;
    if let Err(e) = accept_result {
        tracing::error!(error = %e, "Accept loop ended with a terminal error");
    }
    connections.drain(grace).await?;
    Ok(())
}
