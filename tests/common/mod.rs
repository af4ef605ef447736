//! Shared utilities for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tokio::sync::watch;

use gateway_server::api::api_router;
use gateway_server::config::GatewayConfig;
use gateway_server::datastore::{Datastore, DatastoreError, NoMigrations};
use gateway_server::grpc::health_service;
use gateway_server::{Gateway, HealthState, Phase};

/// In-memory datastore whose availability is flipped by the test.
#[derive(Default)]
pub struct ScriptedDatastore {
    refuse_connect: bool,
    down: AtomicBool,
    pings: AtomicU32,
    closed: AtomicBool,
}

impl ScriptedDatastore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn refusing_connections() -> Self {
        Self {
            refuse_connect: true,
            ..Self::default()
        }
    }

    pub fn set_available(&self, available: bool) {
        self.down.store(!available, Ordering::SeqCst);
    }

    pub fn pings(&self) -> u32 {
        self.pings.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Datastore for ScriptedDatastore {
    async fn connect(&self) -> Result<(), DatastoreError> {
        if self.refuse_connect {
            return Err(DatastoreError::Other("connection refused".into()));
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), DatastoreError> {
        self.pings.fetch_add(1, Ordering::SeqCst);
        if self.down.load(Ordering::SeqCst) {
            return Err(DatastoreError::Other("ping failed".into()));
        }
        Ok(())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Gateway config on a fixed local port with fast monitor loops.
pub fn test_config(port: u16, grace_secs: u64) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.host = "127.0.0.1".into();
    config.listener.port = port;
    config.lifecycle.shutdown_grace_period_secs = grace_secs;
    config.monitor.liveness_interval_ms = 50;
    config.monitor.liveness_timeout_ms = 500;
    config.monitor.readiness_interval_ms = 20;
    config.monitor.datastore_interval_ms = 20;
    config.datastore.ping_timeout_ms = 200;
    config.auth.basic_auth_user = "admin".into();
    config.auth.basic_auth_password = "letmein".into();
    config
}

/// Example API plus `/slow`, which answers after `delay`.
pub fn test_api(health: Arc<HealthState>, delay: Duration) -> Router {
    api_router(health).route(
        "/slow",
        get(move || async move {
            tokio::time::sleep(delay).await;
            "done"
        }),
    )
}

/// A gateway wired the way the binary wires it, minus Postgres.
pub async fn test_gateway(
    config: GatewayConfig,
    datastore: Arc<ScriptedDatastore>,
    slow_delay: Duration,
) -> Gateway<ScriptedDatastore, NoMigrations> {
    let (reporter, grpc) = health_service().await;
    let gateway = Gateway::new(config, datastore, NoMigrations)
        .with_grpc(grpc)
        .with_grpc_reporter(reporter);
    let api = test_api(gateway.health(), slow_delay);
    gateway.with_api(api)
}

pub async fn wait_for_phase(phase: &mut watch::Receiver<Phase>, target: Phase) {
    tokio::time::timeout(Duration::from_secs(5), phase.wait_for(|p| *p == target))
        .await
        .expect("timed out waiting for phase")
        .expect("phase channel closed");
}

/// Poll `condition` every 5ms for up to 5s; returns how long it took.
pub async fn wait_until(mut condition: impl FnMut() -> bool) -> Duration {
    let started = tokio::time::Instant::now();
    let deadline = started + Duration::from_secs(5);
    while !condition() {
        assert!(tokio::time::Instant::now() < deadline, "condition not met within 5s");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    started.elapsed()
}

/// Start a mock upstream that answers every request with `body` and echoes the
/// request line in the `x-request-line` header.
pub async fn start_mock_backend(addr: SocketAddr, body: &'static str) {
    let listener = TcpListener::bind(addr).await.unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        let mut buf = vec![0u8; 4096];
                        let n = tokio::io::AsyncReadExt::read(&mut socket, &mut buf)
                            .await
                            .unwrap_or(0);
                        let head = String::from_utf8_lossy(&buf[..n]).to_string();
                        let request_line = head.lines().next().unwrap_or_default().to_string();

                        let response = format!(
                            "HTTP/1.1 200 OK\r\nx-request-line: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            request_line,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });
}
