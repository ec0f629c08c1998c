//! Database layer for the shelter service
//!
//! Provides:
//! - SeaORM entity models
//! - The `ShelterStore` persistence port
//! - Postgres repository and in-memory implementations
//! - Connection pool management and migrations

mod memory;
pub mod models;
mod repository;
mod store;

pub use memory::MemoryStore;
pub use repository::Repository;
pub use store::{AnimalFilter, ApplicationFilter, ShelterStore, TaskFilter};

use crate::config::DatabaseConfig;
use crate::errors::{AppError, Result};
use backoff::{future::retry, ExponentialBackoff};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection};
use std::time::Duration;
use tracing::{info, warn};

/// Database connection pool wrapper
#[derive(Clone)]
pub struct DbPool {
    /// Primary connection (for writes)
    pub primary: DatabaseConnection,

    /// Read replica connection (optional)
    pub replica: Option<DatabaseConnection>,
}

fn connect_options(url: &str, config: &DatabaseConfig) -> ConnectOptions {
    let mut opts = ConnectOptions::new(url);
    opts.max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .sqlx_logging(false);
    opts
}

/// Connect with exponential backoff until `connect_retry_secs` runs out
async fn connect_with_retry(label: &'static str, url: &str, config: &DatabaseConfig) -> Result<DatabaseConnection> {
    let policy = ExponentialBackoff {
        max_elapsed_time: Some(Duration::from_secs(config.connect_retry_secs)),
        ..ExponentialBackoff::default()
    };

    retry(policy, || async {
        Database::connect(connect_options(url, config)).await.map_err(|e| {
            warn!(connection = label, error = %e, "Database connect failed, retrying");
            backoff::Error::transient(e)
        })
    })
    .await
    .map_err(|e| AppError::DatabaseConnection {
        message: format!("Failed to connect to {}: {}", label, e),
    })
}

impl DbPool {
    /// Create a new database pool from configuration
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        info!("Connecting to primary database...");
        let primary = connect_with_retry("primary", &config.url, config).await?;

        let replica = match config.read_url.as_deref() {
            Some(read_url) => {
                info!("Connecting to read replica...");
                Some(connect_with_retry("replica", read_url, config).await?)
            }
            None => None,
        };

        info!("Database connections established");

        Ok(Self { primary, replica })
    }

    /// Apply pending migrations on the primary
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(self.primary.get_postgres_connection_pool())
            .await?;
        info!("Database migrations applied");
        Ok(())
    }

    /// Get the connection for reads (replica if available, otherwise primary)
    pub fn read(&self) -> &DatabaseConnection {
        self.replica.as_ref().unwrap_or(&self.primary)
    }

    /// Get the connection for writes (always primary)
    pub fn write(&self) -> &DatabaseConnection {
        &self.primary
    }

    /// Ping the database to check connectivity
    pub async fn ping(&self) -> Result<()> {
        self.primary
            .execute_unprepared("SELECT 1")
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Primary ping failed: {}", e),
            })?;

        if let Some(ref replica) = self.replica {
            replica
                .execute_unprepared("SELECT 1")
                .await
                .map_err(|e| AppError::DatabaseConnection {
                    message: format!("Replica ping failed: {}", e),
                })?;
        }

        Ok(())
    }
}
