//! gateway-server
//!
//! ```text
//!                     ┌──────────────────────────────────────────────────────────┐
//!                     │                        GATEWAY                           │
//!   client (h1 / h2c) │  ┌──────────┐   ┌──────────┐   gRPC  ┌────────────────┐  │
//!  ───────────────────┼─▶│   net    │──▶│  demux   │────────▶│ grpc.health.v1 │  │
//!                     │  │ listener │   └────┬─────┘         └────────────────┘  │
//!                     │  └──────────┘        │ HTTP                              │
//!                     │                      ▼                                   │
//!                     │   /probe/*   /api/* (audit → ready)   /proxy/*   / (auth) │
//!                     │                                                          │
//!                     │  ┌────────────────────────────────────────────────────┐  │
//!                     │  │ monitors: liveness · readiness · datastore         │  │
//!                     │  │   → HealthState flags                              │  │
//!                     │  │ lifecycle: bind → connect → migrate → serve → drain│  │
//!                     │  └────────────────────────────────────────────────────┘  │
//!                     └──────────────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::PathBuf;
use std::sync::Arc;

use gateway_server::api::api_router;
use gateway_server::config::{load_config, GatewayConfig};
use gateway_server::datastore::{PgDatastore, SqlMigrator};
use gateway_server::grpc::health_service;
use gateway_server::lifecycle::{signals, Gateway};
use gateway_server::observability::{init_logging, init_metrics};

#[derive(Parser)]
#[command(name = "gateway-server", version)]
#[command(about = "gRPC and HTTP gateway on a single port", long_about = None)]
struct Cli {
    /// TOML configuration file. Built-in defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

/// Wire Postgres, gRPC health and the API into a gateway.
async fn build_gateway(
    config: GatewayConfig,
    metrics: Option<PrometheusHandle>,
) -> Gateway<PgDatastore, SqlMigrator> {
    let datastore = Arc::new(PgDatastore::new(&config.datastore));
    let migrator = SqlMigrator::new(&config.datastore.migrations_dir);
    let (reporter, grpc) = health_service().await;

    let mut gateway = Gateway::new(config, datastore, migrator)
        .with_grpc(grpc)
        .with_grpc_reporter(reporter);
    let health = gateway.health();
    gateway = gateway.with_api(api_router(health));
    if let Some(handle) = metrics {
        gateway = gateway.with_metrics(handle);
    }
    gateway
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match cli.config.as_deref() {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };

    init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "gateway-server starting");
    tracing::info!(
        endpoint = %config.listener.endpoint(),
        max_connections = config.listener.max_connections,
        request_timeout_secs = config.timeouts.request_secs,
        shutdown_grace_period_secs = config.lifecycle.shutdown_grace_period_secs,
        "Configuration loaded"
    );

    let metrics = if config.observability.metrics_enabled {
        match init_metrics() {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::error!(error = %e, "Failed to install metrics recorder");
                None
            }
        }
    } else {
        None
    };

    let gateway = build_gateway(config, metrics).await;

    let shutdown = gateway.shutdown();
    tokio::spawn(async move {
        if let Err(e) = signals::trigger_on_signal(shutdown).await {
            tracing::error!(error = %e, "Failed to install signal handlers");
        }
    });

    gateway.run().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_server::lifecycle::Phase;

    #[test]
    fn parses_config_flag() {
        let cli = Cli::try_parse_from(["gateway-server", "--config", "gateway.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("gateway.toml")));

        let cli = Cli::try_parse_from(["gateway-server"]).unwrap();
        assert!(cli.config.is_none());
    }

    #[tokio::test]
    async fn builds_gateway_without_connecting() {
        let gateway = build_gateway(GatewayConfig::default(), None).await;
        assert_eq!(*gateway.phase().borrow(), Phase::Starting);
        assert!(!gateway.health().is_live());
        assert!(!gateway.shutdown().is_triggered());
    }
}
