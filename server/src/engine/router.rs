//! Tenant connection router
//!
//! Maps a project id to a pool on that project's own database. Pools are
//! opened lazily on first use and kept in a registry until the project is
//! evicted or the router shuts down. The control-plane pool is only used for
//! `CREATE DATABASE` / `DROP DATABASE` and is never handed out for tenant work.

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use dashmap::DashMap;
use regex::Regex;
use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use uuid::Uuid;

use super::error::RoutingError;
use crate::core::config::TenantConfig;
use crate::data::{ProjectRepository, ProjectStatus};
use crate::utils::sql::quote_ident;

static DATABASE_NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9_]{0,62}$").expect("Invalid regex"));

/// Reject anything that is not a plain lowercase PostgreSQL database name
pub fn validate_database_name(name: &str) -> Result<(), RoutingError> {
    if DATABASE_NAME_PATTERN.is_match(name) {
        Ok(())
    } else {
        Err(RoutingError::InvalidDatabaseName(name.to_string()))
    }
}

pub struct TenantRouter {
    projects: Arc<dyn ProjectRepository>,
    base_options: PgConnectOptions,
    control_database: String,
    admin: PgPool,
    config: TenantConfig,
    pools: DashMap<Uuid, PgPool>,
}

impl TenantRouter {
    /// Build a router
    ///
    /// `base_options` are the control-plane connect options; tenant pools
    /// reuse host, credentials and session settings with the database
    /// swapped. `admin` is the control-plane pool.
    pub fn new(
        projects: Arc<dyn ProjectRepository>,
        base_options: PgConnectOptions,
        admin: PgPool,
        config: TenantConfig,
    ) -> Self {
        let control_database = base_options
            .get_database()
            .unwrap_or_else(|| base_options.get_username())
            .to_string();
        Self {
            projects,
            base_options,
            control_database,
            admin,
            config,
            pools: DashMap::new(),
        }
    }

    /// Pool for a provisioned project's database
    pub async fn resolve(&self, project_id: Uuid) -> Result<PgPool, RoutingError> {
        if let Some(pool) = self.pools.get(&project_id) {
            return Ok(pool.clone());
        }

        let project = self
            .projects
            .get_project(project_id)
            .await?
            .ok_or(RoutingError::ProjectNotFound(project_id))?;

        if project.status != ProjectStatus::Active {
            return Err(RoutingError::NotProvisioned {
                project_id,
                status: project.status,
            });
        }
        validate_database_name(&project.database_name)?;
        if project.database_name == self.control_database {
            return Err(RoutingError::ControlPlaneDatabase(project_id));
        }

        let pool = self
            .pools
            .entry(project_id)
            .or_insert_with(|| self.open_pool(&project.database_name))
            .clone();

        tracing::debug!(
            %project_id,
            database = %project.database_name,
            "Tenant pool registered"
        );
        Ok(pool)
    }

    fn open_pool(&self, database: &str) -> PgPool {
        let options = self.base_options.clone().database(database);
        PgPoolOptions::new()
            .max_connections(self.config.max_connections)
            .min_connections(0)
            .acquire_timeout(Duration::from_secs(self.config.acquire_timeout_secs))
            .idle_timeout(Duration::from_secs(self.config.idle_timeout_secs))
            .connect_lazy_with(options)
    }

    /// Number of open tenant pools
    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }

    /// Drop and close the pool for a project, if one is open
    pub async fn evict(&self, project_id: Uuid) -> bool {
        match self.pools.remove(&project_id) {
            Some((_, pool)) => {
                pool.close().await;
                tracing::debug!(%project_id, "Tenant pool closed");
                true
            }
            None => false,
        }
    }

    /// Create the physical database for a new project
    pub async fn create_database(&self, name: &str) -> Result<(), RoutingError> {
        validate_database_name(name)?;
        if name == self.control_database {
            return Err(RoutingError::InvalidDatabaseName(name.to_string()));
        }
        let sql = format!("CREATE DATABASE {}", quote_ident(name));
        sqlx::raw_sql(&sql).execute(&self.admin).await?;
        tracing::debug!(database = %name, "Tenant database created");
        Ok(())
    }

    /// Drop a project's physical database, terminating remaining sessions
    pub async fn drop_database_if_exists(&self, name: &str) -> Result<(), RoutingError> {
        validate_database_name(name)?;
        if name == self.control_database {
            return Err(RoutingError::InvalidDatabaseName(name.to_string()));
        }
        let sql = format!("DROP DATABASE IF EXISTS {} WITH (FORCE)", quote_ident(name));
        sqlx::raw_sql(&sql).execute(&self.admin).await?;
        tracing::debug!(database = %name, "Tenant database dropped");
        Ok(())
    }

    /// Close every tenant pool
    pub async fn shutdown(&self) {
        let ids: Vec<Uuid> = self.pools.iter().map(|entry| *entry.key()).collect();
        let pools: Vec<PgPool> = ids
            .iter()
            .filter_map(|id| self.pools.remove(id).map(|(_, pool)| pool))
            .collect();
        let count = pools.len();
        futures::future::join_all(pools.iter().map(|pool| pool.close())).await;
        tracing::debug!(count, "Tenant pools closed");
    }
}
