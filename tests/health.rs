//! Monitors, probes and the readiness gate over a real listener.

use std::sync::Arc;
use std::time::Duration;

use gateway_server::Phase;
use reqwest::StatusCode;
use serde_json::Value;

mod common;

use common::{test_config, test_gateway, wait_for_phase, wait_until, ScriptedDatastore};

#[tokio::test]
async fn datastore_outage_flips_readiness_only() {
    let port = 28311;
    let datastore = Arc::new(ScriptedDatastore::new());
    let gateway = test_gateway(test_config(port, 1), Arc::clone(&datastore), Duration::ZERO).await;
    let health = gateway.health();
    let mut phase = gateway.phase();
    let shutdown = gateway.shutdown();
    let run = tokio::spawn(gateway.run());

    wait_for_phase(&mut phase, Phase::Serving).await;
    wait_until(|| health.is_ready() && health.is_live()).await;

    let client = reqwest::Client::new();
    let base = format!("http://127.0.0.1:{port}");
    let status_of = |path: &str| {
        let request = client.get(format!("{base}{path}"));
        async move { request.send().await.unwrap().status() }
    };

    assert_eq!(status_of("/api/v1/status").await, StatusCode::OK);

    datastore.set_available(false);
    wait_until(|| !health.is_datastore_available() && !health.is_ready()).await;

    assert_eq!(status_of("/api/v1/status").await, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(status_of("/probe/ready").await, StatusCode::SERVICE_UNAVAILABLE);
    // Liveness and startup do not depend on the datastore.
    assert_eq!(status_of("/probe/live").await, StatusCode::OK);
    assert_eq!(status_of("/probe/startup").await, StatusCode::OK);

    datastore.set_available(true);
    wait_until(|| health.is_datastore_available() && health.is_ready()).await;

    assert_eq!(status_of("/api/v1/status").await, StatusCode::OK);
    assert_eq!(status_of("/probe/ready").await, StatusCode::OK);

    shutdown.trigger();
    assert!(run.await.unwrap().is_ok());
}

#[tokio::test]
async fn datastore_recovery_within_monitor_intervals() {
    let port = 28314;
    let interval = Duration::from_millis(100);
    let slack = Duration::from_millis(100);

    let mut config = test_config(port, 1);
    config.monitor.datastore_interval_ms = 100;
    config.monitor.readiness_interval_ms = 100;

    let datastore = Arc::new(ScriptedDatastore::new());
    datastore.set_available(false);
    let gateway = test_gateway(config, Arc::clone(&datastore), Duration::ZERO).await;
    let health = gateway.health();
    let mut phase = gateway.phase();
    let shutdown = gateway.shutdown();
    let run = tokio::spawn(gateway.run());

    wait_for_phase(&mut phase, Phase::Serving).await;
    wait_until(|| datastore.pings() > 0 && !health.is_datastore_available()).await;
    assert!(!health.is_ready());

    datastore.set_available(true);
    let started = std::time::Instant::now();
    let available_after = wait_until(|| health.is_datastore_available()).await;
    wait_until(|| health.is_ready()).await;
    let ready_after = started.elapsed();

    assert!(
        available_after <= interval * 2 + slack,
        "datastore_available after {available_after:?}"
    );
    assert!(ready_after <= interval * 3 + slack, "ready after {ready_after:?}");

    shutdown.trigger();
    assert!(run.await.unwrap().is_ok());
}

#[tokio::test]
async fn probe_bodies_carry_snapshot() {
    let port = 28312;
    let datastore = Arc::new(ScriptedDatastore::new());
    datastore.set_available(false);
    let gateway = test_gateway(test_config(port, 1), Arc::clone(&datastore), Duration::ZERO).await;
    let health = gateway.health();
    let mut phase = gateway.phase();
    let shutdown = gateway.shutdown();
    let run = tokio::spawn(gateway.run());

    wait_for_phase(&mut phase, Phase::Serving).await;
    wait_until(|| health.is_live() && datastore.pings() > 0).await;

    let response = reqwest::get(format!("http://127.0.0.1:{port}/probe/ready")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["ready"], false);
    assert_eq!(body["live"], true);
    assert_eq!(body["listener_available"], true);
    assert_eq!(body["datastore_available"], false);
    assert_eq!(body["shutdown_requested"], false);

    shutdown.trigger();
    assert!(run.await.unwrap().is_ok());
}

#[tokio::test]
async fn api_response_reports_status() {
    let port = 28313;
    let datastore = Arc::new(ScriptedDatastore::new());
    let gateway = test_gateway(test_config(port, 1), datastore, Duration::ZERO).await;
    let health = gateway.health();
    let mut phase = gateway.phase();
    let shutdown = gateway.shutdown();
    let run = tokio::spawn(gateway.run());

    wait_for_phase(&mut phase, Phase::Serving).await;
    wait_until(|| health.is_ready()).await;

    let response = reqwest::get(format!("http://127.0.0.1:{port}/api/v1/status")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["service"], "gateway-server");
    assert_eq!(body["health"]["ready"], true);

    shutdown.trigger();
    assert!(run.await.unwrap().is_ok());
}
