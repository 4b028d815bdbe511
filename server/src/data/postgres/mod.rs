//! PostgreSQL control-plane service
//!
//! Owns the pool for the control-plane database (the `projects` registry)
//! with:
//! - Connection pooling with min/max bounds
//! - Idle connection cleanup
//! - Connection lifetime cycling
//! - Query timeout protection
//!
//! Tenant databases are reached through the engine's router, which derives
//! its connection settings from [`PostgresService::connect_options`].

pub mod error;
mod migrations;
pub mod repositories;
mod repository_impl;
pub mod schema;

pub use error::PostgresError;
pub use sqlx::PgPool;

use std::sync::Arc;
use std::time::Duration;

use sqlx::ConnectOptions;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::log::LevelFilter;

use crate::core::config::PostgresConfig;
use crate::core::constants::{
    POSTGRES_DEFAULT_ACQUIRE_TIMEOUT_SECS, POSTGRES_DEFAULT_IDLE_TIMEOUT_SECS,
    POSTGRES_DEFAULT_MAX_CONNECTIONS, POSTGRES_DEFAULT_MAX_LIFETIME_SECS,
    POSTGRES_DEFAULT_MIN_CONNECTIONS, POSTGRES_DEFAULT_STATEMENT_TIMEOUT_SECS,
    POSTGRES_HEALTH_CHECK_INTERVAL_SECS,
};

fn or_default<T: PartialEq + Default>(value: T, default: T) -> T {
    if value == T::default() { default } else { value }
}

/// Parse a PostgreSQL URL into connect options with statement logging and timeout
pub fn connect_options(url: &str, statement_timeout_secs: u64) -> Result<PgConnectOptions, PostgresError> {
    if url.is_empty() {
        return Err(PostgresError::Config("PostgreSQL URL is required".into()));
    }

    let mut options: PgConnectOptions = url
        .parse()
        .map_err(|e| PostgresError::Config(format!("Invalid PostgreSQL URL: {}", e)))?;

    options = options.log_statements(LevelFilter::Trace);

    // Set statement timeout at connection level for query protection
    if statement_timeout_secs > 0 {
        options = options.options([("statement_timeout", format!("{}s", statement_timeout_secs))]);
    }

    Ok(options)
}

/// Control-plane database service
///
/// Should be created once at startup and shared; the tenant router borrows
/// its pool for `CREATE DATABASE` / `DROP DATABASE`.
pub struct PostgresService {
    pool: PgPool,
    options: PgConnectOptions,
    schema_version: i32,
}

impl PostgresService {
    /// Connect, apply pending migrations and return the service
    pub async fn init(config: &PostgresConfig) -> Result<Self, PostgresError> {
        let max_connections = or_default(config.max_connections, POSTGRES_DEFAULT_MAX_CONNECTIONS);
        let min_connections = or_default(config.min_connections, POSTGRES_DEFAULT_MIN_CONNECTIONS);
        let acquire_timeout =
            or_default(config.acquire_timeout_secs, POSTGRES_DEFAULT_ACQUIRE_TIMEOUT_SECS);
        let idle_timeout = or_default(config.idle_timeout_secs, POSTGRES_DEFAULT_IDLE_TIMEOUT_SECS);
        let max_lifetime = or_default(config.max_lifetime_secs, POSTGRES_DEFAULT_MAX_LIFETIME_SECS);
        let statement_timeout =
            or_default(config.statement_timeout_secs, POSTGRES_DEFAULT_STATEMENT_TIMEOUT_SECS);

        let options = connect_options(&config.url, statement_timeout)?;

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(acquire_timeout))
            .idle_timeout(Duration::from_secs(idle_timeout))
            .max_lifetime(Duration::from_secs(max_lifetime))
            .connect_with(options.clone())
            .await?;

        let schema_version = migrations::run_migrations(&pool).await?;

        tracing::debug!(
            max_connections,
            min_connections,
            acquire_timeout_secs = acquire_timeout,
            idle_timeout_secs = idle_timeout,
            max_lifetime_secs = max_lifetime,
            statement_timeout_secs = statement_timeout,
            schema_version,
            "PostgresService initialized"
        );
        Ok(Self {
            pool,
            options,
            schema_version,
        })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Connect options the control pool was built from
    pub fn connect_options(&self) -> &PgConnectOptions {
        &self.options
    }

    /// Control-plane schema version after migrations
    pub fn schema_version(&self) -> i32 {
        self.schema_version
    }

    /// Start a background health check task
    pub fn start_health_check_task(
        self: &Arc<Self>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let db = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(Duration::from_secs(POSTGRES_HEALTH_CHECK_INTERVAL_SECS));
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            tracing::debug!("PostgreSQL health check task shutting down");
                            break;
                        }
                    }
                    _ = interval.tick() => {
                        if let Err(e) = sqlx::query("SELECT 1").execute(&db.pool).await {
                            tracing::warn!("PostgreSQL health check failed: {}", e);
                        }
                    }
                }
            }
        })
    }
}
