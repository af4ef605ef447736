//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener endpoint (host, port) shared by gRPC and HTTP.
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Startup/shutdown settings.
    pub lifecycle: LifecycleConfig,

    /// Background monitor settings.
    pub monitor: MonitorConfig,

    /// PostgreSQL connection settings.
    pub datastore: DatastoreConfig,

    /// Credentials for the root route.
    pub auth: AuthConfig,

    /// Reverse proxy subtree.
    pub reverse_proxy: ReverseProxyConfig,

    /// Bundled static assets.
    pub assets: AssetsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub security: SecurityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Host or IP to bind (e.g., "0.0.0.0", "::1").
    pub host: String,

    /// TCP port to bind.
    pub port: u16,

    /// Maximum concurrent connections (backpressure).
    pub max_connections: usize,
}

impl ListenerConfig {
    /// Render the endpoint as `host:port`, bracketing IPv6 literals.
    pub fn endpoint(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            max_connections: 10_000,
        }
    }
}

/// Timeout configuration for request handling.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Lifecycle configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// How long in-flight requests get to finish once shutdown starts.
    pub shutdown_grace_period_secs: u64,
}

impl LifecycleConfig {
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_period_secs)
    }
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            shutdown_grace_period_secs: 10,
        }
    }
}

/// Monitor loop configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Liveness self-check interval in milliseconds.
    pub liveness_interval_ms: u64,

    /// Upper bound for a single liveness self-check in milliseconds.
    pub liveness_timeout_ms: u64,

    /// Consecutive self-check failures before liveness is given up for good.
    pub liveness_failure_threshold: u32,

    /// Readiness recomputation interval in milliseconds.
    pub readiness_interval_ms: u64,

    /// Datastore ping interval in milliseconds.
    pub datastore_interval_ms: u64,
}

impl MonitorConfig {
    pub fn liveness_interval(&self) -> Duration {
        Duration::from_millis(self.liveness_interval_ms)
    }

    pub fn liveness_timeout(&self) -> Duration {
        Duration::from_millis(self.liveness_timeout_ms)
    }

    pub fn readiness_interval(&self) -> Duration {
        Duration::from_millis(self.readiness_interval_ms)
    }

    pub fn datastore_interval(&self) -> Duration {
        Duration::from_millis(self.datastore_interval_ms)
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            liveness_interval_ms: 5000,
            liveness_timeout_ms: 1000,
            liveness_failure_threshold: 3,
            readiness_interval_ms: 1000,
            datastore_interval_ms: 5000,
        }
    }
}

/// PostgreSQL configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatastoreConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,

    /// Schema placed on the connection `search_path`.
    pub schema: String,

    /// Pool size.
    pub max_connections: u32,

    /// Pool acquire/connect timeout in seconds.
    pub connect_timeout_secs: u64,

    /// Upper bound for a single health ping in milliseconds.
    pub ping_timeout_ms: u64,

    /// Directory holding `<version>_<name>.sql` migrations.
    pub migrations_dir: PathBuf,
}

impl DatastoreConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn ping_timeout(&self) -> Duration {
        Duration::from_millis(self.ping_timeout_ms)
    }
}

impl Default for DatastoreConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            username: "postgres".to_string(),
            password: String::new(),
            database: "postgres".to_string(),
            schema: "public".to_string(),
            max_connections: 10,
            connect_timeout_secs: 5,
            ping_timeout_ms: 1000,
            migrations_dir: PathBuf::from("migrations"),
        }
    }
}

/// Basic authentication for the root route.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    pub basic_auth_user: String,
    pub basic_auth_password: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            basic_auth_user: "admin".to_string(),
            // WARNING: This is a placeholder! Change this in production.
            basic_auth_password: "CHANGE_ME_IN_PRODUCTION".to_string(),
        }
    }
}

/// Reverse proxy subtree configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReverseProxyConfig {
    /// Path prefix the proxy is mounted on (e.g., "/proxy").
    pub mount: String,

    /// Upstream base URL. Requests keep their full path, joined onto the upstream path.
    pub upstream_url: Option<String>,
}

impl Default for ReverseProxyConfig {
    fn default() -> Self {
        Self {
            mount: "/proxy".to_string(),
            upstream_url: None,
        }
    }
}

/// Static asset configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AssetsConfig {
    /// Directory served under `/static` (and `favicon.ico` at the root)
    /// instead of the assets built into the binary.
    pub dir: Option<PathBuf>,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Human-readable or JSON log lines.
    pub log_format: LogFormat,

    /// Expose the `/metrics` endpoint.
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}
