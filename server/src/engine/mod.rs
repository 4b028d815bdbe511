//! Multi-tenant dynamic schema engine
//!
//! Every operation follows the same short workflow:
//! validate -> route -> conflict-check -> execute -> re-introspect.
//!
//! - `validate` - identifier, type, default and body checks; input-to-spec mapping
//! - `ddl` - pure statement builders over validated specs
//! - `catalog` - read-only introspection of a tenant database
//! - `router` - project id to tenant pool registry, database provisioning
//! - `executor` - deadline-bounded reads and transactional DDL batches
//! - `tables`, `columns`, `indexes`, `functions` - the orchestrating services
//! - `command` - serde command object dispatched onto the services

pub mod catalog;
pub mod columns;
pub mod command;
pub mod ddl;
pub mod error;
pub mod executor;
pub mod functions;
pub mod indexes;
pub mod router;
pub mod tables;
pub mod types;
pub mod validate;

pub use columns::ColumnService;
pub use command::{CommandOutput, SchemaCommand};
pub use error::{ErrorKind, RoutingError, SchemaError};
pub use functions::FunctionService;
pub use indexes::IndexService;
pub use router::TenantRouter;
pub use tables::TableService;

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use uuid::Uuid;

use executor::Session;
use types::{ColumnSpec, QualifiedName, TableDefinition};
use validate::Subject;

/// Caller-supplied scope of one schema operation
///
/// Authorization is decided before a context is built; the engine only uses
/// it to route and to bound the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestContext {
    pub project_id: Uuid,
    /// Overrides the configured operation timeout
    pub timeout: Option<Duration>,
}

impl RequestContext {
    pub fn new(project_id: Uuid) -> Self {
        Self {
            project_id,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Shared handle for the schema services
#[derive(Clone)]
pub struct SchemaEngine {
    router: Arc<TenantRouter>,
    default_timeout: Duration,
}

impl SchemaEngine {
    pub fn new(router: Arc<TenantRouter>, default_timeout: Duration) -> Self {
        Self {
            router,
            default_timeout,
        }
    }

    pub fn tables(&self) -> TableService {
        TableService::new(self.clone())
    }

    pub fn columns(&self) -> ColumnService {
        ColumnService::new(self.clone())
    }

    pub fn indexes(&self) -> IndexService {
        IndexService::new(self.clone())
    }

    pub fn functions(&self) -> FunctionService {
        FunctionService::new(self.clone())
    }

    /// Route the project and start a deadline-bounded session
    pub(crate) async fn open(
        &self,
        ctx: &RequestContext,
        operation: &'static str,
        target: impl Into<String>,
    ) -> Result<Session, SchemaError> {
        let pool = self.router.resolve(ctx.project_id).await?;
        let timeout = ctx.timeout.unwrap_or(self.default_timeout);
        let target = target.into();
        tracing::debug!(
            project_id = %ctx.project_id,
            operation,
            target = %target,
            timeout_secs = timeout.as_secs(),
            "Schema operation routed"
        );
        Ok(Session::new(pool, ctx.project_id, operation, target, timeout))
    }
}

// ============================================================================
// Catalog guards shared by the services
// ============================================================================

pub(crate) async fn require_schema(
    session: &Session,
    pool: &PgPool,
    schema: &str,
) -> Result<(), SchemaError> {
    if session.read(catalog::schema_exists(pool, schema)).await? {
        Ok(())
    } else {
        Err(SchemaError::not_found(
            Subject::Schema,
            format!("schema '{}' does not exist", schema),
        ))
    }
}

pub(crate) async fn require_table(
    session: &Session,
    pool: &PgPool,
    table: &QualifiedName,
) -> Result<(), SchemaError> {
    require_schema(session, pool, &table.schema).await?;
    if session.read(catalog::table_exists(pool, table)).await? {
        Ok(())
    } else {
        Err(SchemaError::not_found(
            Subject::Table,
            format!("table '{}' does not exist", table),
        ))
    }
}

/// Fail unless every foreign key target exists
///
/// A reference back to `table` may name a column declared in the same batch.
pub(crate) async fn require_references(
    session: &Session,
    pool: &PgPool,
    table: &QualifiedName,
    batch: &[ColumnSpec],
) -> Result<(), SchemaError> {
    for column in batch {
        let Some(fk) = &column.reference else {
            continue;
        };
        if fk.table == *table && batch.iter().any(|c| c.name == fk.column) {
            continue;
        }
        let found = session.read(catalog::table_exists(pool, &fk.table)).await?
            && session
                .read(catalog::column_exists(pool, &fk.table, &fk.column))
                .await?;
        if !found {
            return Err(SchemaError::conflict(
                Subject::Column,
                "referenceNotFound",
                format!(
                    "column '{}' references {}.{} which does not exist",
                    column.name, fk.table, fk.column
                ),
            ));
        }
    }
    Ok(())
}

pub(crate) async fn describe_table(
    session: &Session,
    pool: &PgPool,
    table: &QualifiedName,
) -> Result<TableDefinition, SchemaError> {
    let columns = session.read(catalog::list_columns(pool, table)).await?;
    Ok(TableDefinition {
        name: table.clone(),
        columns,
    })
}
