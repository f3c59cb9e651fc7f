//! Database connection for the bootstrap sequence.

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::repository::{DbError, MaterialRepository, PostgresMaterialRepository};

/// Settings for the single pool shared by every request.
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

/// Opens the data store once per process and hands back the repository
/// every handler shares.
#[async_trait]
pub trait DatabaseConnector: Send + Sync {
    async fn connect(
        &self,
        database_url: &str,
        settings: &ConnectionSettings,
    ) -> Result<Arc<dyn MaterialRepository>, DbError>;
}

/// PostgreSQL connector backed by a `sqlx` pool.
#[derive(Debug, Default, Clone, Copy)]
pub struct PgConnector;

#[async_trait]
impl DatabaseConnector for PgConnector {
    async fn connect(
        &self,
        database_url: &str,
        settings: &ConnectionSettings,
    ) -> Result<Arc<dyn MaterialRepository>, DbError> {
        info!(
            max_connections = settings.max_connections,
            "Creating PostgreSQL connection pool"
        );

        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(settings.acquire_timeout)
            .test_before_acquire(true)
            .connect(database_url)
            .await
            .map_err(|e| DbError::Connection(format!("Failed to create database pool: {e}")))?;

        let repository = PostgresMaterialRepository::new(pool);
        repository.ensure_schema().await?;

        info!("PostgreSQL connection pool ready");
        Ok(Arc::new(repository))
    }
}
