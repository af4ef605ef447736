//! PostgreSQL datastore backed by an sqlx pool.

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use std::sync::Arc;
use std::time::Duration;

use crate::config::DatastoreConfig;
use crate::datastore::{Datastore, DatastoreError};

/// Postgres handle. The pool is installed by `connect()` and swapped out by `close()`.
pub struct PgDatastore {
    options: PgConnectOptions,
    max_connections: u32,
    connect_timeout: Duration,
    pool: ArcSwapOption<PgPool>,
}

impl PgDatastore {
    pub fn new(config: &DatastoreConfig) -> Self {
        let mut options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.username)
            .database(&config.database)
            .options([("search_path", config.schema.as_str())]);
        if !config.password.is_empty() {
            options = options.password(&config.password);
        }

        Self {
            options,
            max_connections: config.max_connections,
            connect_timeout: config.connect_timeout(),
            pool: ArcSwapOption::empty(),
        }
    }

    /// The live pool, if `connect()` has succeeded and `close()` has not run.
    pub fn pool(&self) -> Option<Arc<PgPool>> {
        self.pool.load_full()
    }
}

#[async_trait]
impl Datastore for PgDatastore {
    async fn connect(&self) -> Result<(), DatastoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(self.max_connections)
            .acquire_timeout(self.connect_timeout)
            .connect_with(self.options.clone())
            .await?;

        tracing::info!(
            host = self.options.get_host(),
            port = self.options.get_port(),
            database = self.options.get_database().unwrap_or_default(),
            "Connected to datastore"
        );
        self.pool.store(Some(Arc::new(pool)));
        Ok(())
    }

    async fn ping(&self) -> Result<(), DatastoreError> {
        let pool = self.pool.load_full().ok_or(DatastoreError::NotConnected)?;
        sqlx::query("SELECT 1").execute(&*pool).await?;
        Ok(())
    }

    async fn close(&self) {
        if let Some(pool) = self.pool.swap(None) {
            pool.close().await;
            tracing::info!("Datastore pool closed");
        }
    }
}
