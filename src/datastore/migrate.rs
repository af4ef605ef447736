//! Schema migration step run between connect and serve.

use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::datastore::{Datastore, PgDatastore};

/// Error type for the migration step.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("migration cancelled by shutdown")]
    Cancelled,

    #[error("datastore is not connected")]
    NotConnected,

    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("migration failed: {0}")]
    Other(String),
}

/// Brings the datastore schema up to date.
#[async_trait]
pub trait Migrator<D: Datastore>: Send + Sync + 'static {
    async fn migrate(&self, cancel: &CancellationToken, datastore: &D) -> Result<(), MigrationError>;
}

/// Migrator for deployments that manage the schema elsewhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMigrations;

#[async_trait]
impl<D: Datastore> Migrator<D> for NoMigrations {
    async fn migrate(&self, _cancel: &CancellationToken, _datastore: &D) -> Result<(), MigrationError> {
        Ok(())
    }
}

/// Runs `<version>_<description>.sql` files from a directory through sqlx.
#[derive(Debug, Clone)]
pub struct SqlMigrator {
    dir: PathBuf,
}

impl SqlMigrator {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl Migrator<PgDatastore> for SqlMigrator {
    async fn migrate(
        &self,
        cancel: &CancellationToken,
        datastore: &PgDatastore,
    ) -> Result<(), MigrationError> {
        let pool = datastore.pool().ok_or(MigrationError::NotConnected)?;
        let migrator = sqlx::migrate::Migrator::new(self.dir.as_path()).await?;

        tracing::info!(
            dir = %self.dir.display(),
            migrations = migrator.iter().count(),
            "Running datastore migrations"
        );

        tokio::select! {
            result = migrator.run(&*pool) => result.map_err(MigrationError::from),
            _ = cancel.cancelled() => Err(MigrationError::Cancelled),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatastoreConfig;

    #[tokio::test]
    async fn sql_migrator_requires_connection() {
        let store = PgDatastore::new(&DatastoreConfig::default());
        let result = SqlMigrator::new("migrations")
            .migrate(&CancellationToken::new(), &store)
            .await;
        assert!(matches!(result, Err(MigrationError::NotConnected)));
    }

    #[tokio::test]
    async fn no_migrations_always_succeeds() {
        let store = PgDatastore::new(&DatastoreConfig::default());
        let result = NoMigrations.migrate(&CancellationToken::new(), &store).await;
        assert!(result.is_ok());
    }
}
