//! Datastore collaborator interfaces.
//!
//! # Data Flow
//! ```text
//! Lifecycle coordinator:
//!     connect() → Migrator::migrate() → serving
//!
//! Datastore monitor:
//!     ping() every interval → HealthState::datastore_available
//!
//! Shutdown:
//!     close() after connections have drained
//! ```
//!
//! # Design Decisions
//! - The handle is shared read-only (`Arc<D>`); pool locking stays inside sqlx
//! - No retry loop here: retrying a failed connect is the client's concern
//! - `ping()` before `connect()` fails with `NotConnected` instead of blocking

pub mod migrate;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;

pub use migrate::{MigrationError, Migrator, NoMigrations, SqlMigrator};
pub use postgres::PgDatastore;

/// Error type for datastore operations.
#[derive(Debug, Error)]
pub enum DatastoreError {
    #[error("datastore is not connected")]
    NotConnected,

    #[error("datastore ping timed out")]
    Timeout,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{0}")]
    Other(String),
}

/// The datastore as seen by the gateway core.
#[async_trait]
pub trait Datastore: Send + Sync + 'static {
    /// Establish the connection pool.
    async fn connect(&self) -> Result<(), DatastoreError>;

    /// Cheap round-trip used by the datastore monitor.
    async fn ping(&self) -> Result<(), DatastoreError>;

    /// Release pooled connections once the gateway has drained.
    async fn close(&self) {}
}
