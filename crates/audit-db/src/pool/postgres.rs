//! PostgreSQL connection pool management
//!
//! The audit layer never invents a database to talk to: the connection URL
//! is supplied by the host, either directly or through `DATABASE_URL`.
//! Only the pool tuning knobs carry defaults.

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

use audit_core::{AuditError, AuditResult};

use crate::error::map_db_error;

/// Database configuration for connection pool
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of connections to maintain
    pub min_connections: u32,
    /// Maximum time to wait for a connection
    pub acquire_timeout: Duration,
    /// Maximum idle time before a connection is closed
    pub idle_timeout: Duration,
    /// Maximum lifetime of a connection
    pub max_lifetime: Duration,
}

impl DatabaseConfig {
    /// Pool tuning defaults around a caller-supplied connection URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 10,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(10),
            idle_timeout: Duration::from_secs(300),
            max_lifetime: Duration::from_secs(1800),
        }
    }

    /// Create config from environment variables
    ///
    /// `DATABASE_URL` is required and there is no fallback database;
    /// `DATABASE_MAX_CONNECTIONS` and `DATABASE_MIN_CONNECTIONS` override
    /// the pool tuning defaults.
    pub fn from_env() -> AuditResult<Self> {
        let url = std::env::var("DATABASE_URL").map_err(|_| {
            AuditError::InvalidConfig("DATABASE_URL must be set".to_string())
        })?;

        let mut config = Self::new(url);
        if let Some(max) = env_u32("DATABASE_MAX_CONNECTIONS") {
            config.max_connections = max;
        }
        if let Some(min) = env_u32("DATABASE_MIN_CONNECTIONS") {
            config.min_connections = min;
        }
        Ok(config)
    }
}

fn env_u32(name: &str) -> Option<u32> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

/// Create a new PostgreSQL connection pool
pub async fn create_pool(config: &DatabaseConfig) -> AuditResult<PgPool> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(config.idle_timeout)
        .max_lifetime(config.max_lifetime)
        .connect(&config.url)
        .await
        .map_err(map_db_error)
}

/// Create a connection pool from the DATABASE_URL environment variable
pub async fn create_pool_from_env() -> AuditResult<PgPool> {
    let config = DatabaseConfig::from_env()?;
    create_pool(&config).await
}
