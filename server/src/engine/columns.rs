//! Column operations
//!
//! Batches are validated as a whole before any statement runs, checked with
//! a single existence query, and applied in one transaction.

use super::error::SchemaError;
use super::types::{
    AlterColumnInput, AlterColumnSpec, ColumnDefinition, ColumnInput, ColumnSpec,
};
use super::validate::{self, IdentifierKind, Subject};
use super::{RequestContext, SchemaEngine, catalog, ddl, require_references, require_table};

pub struct ColumnService {
    engine: SchemaEngine,
}

fn names(specs: &[ColumnSpec]) -> Vec<&str> {
    specs.iter().map(|c| c.name.as_str()).collect()
}

/// True when every altered column now has the requested type and, where one
/// was asked for, the requested nullability
fn alteration_visible(specs: &[AlterColumnSpec], columns: &[ColumnDefinition]) -> bool {
    specs.iter().all(|spec| {
        columns.iter().any(|c| {
            c.name == spec.name
                && c.data_type == spec.data_type.as_str()
                && spec.nullable.is_none_or(|nullable| c.nullable == nullable)
        })
    })
}

impl ColumnService {
    pub fn new(engine: SchemaEngine) -> Self {
        Self { engine }
    }

    pub async fn list_columns(
        &self,
        ctx: &RequestContext,
        table: &str,
    ) -> Result<Vec<ColumnDefinition>, SchemaError> {
        let table = validate::table_name(table)?;

        let session = self.engine.open(ctx, "list_columns", table.to_string()).await?;
        let pool = session.pool().clone();
        require_table(&session, &pool, &table).await?;
        session.read(catalog::list_columns(&pool, &table)).await
    }

    /// Add a batch of columns; returns the table's full column list
    pub async fn add_columns(
        &self,
        ctx: &RequestContext,
        table: &str,
        columns: &[ColumnInput],
    ) -> Result<Vec<ColumnDefinition>, SchemaError> {
        let table = validate::table_name(table)?;
        let specs = validate::column_specs(columns)?;

        let mut session = self.engine.open(ctx, "add_columns", table.to_string()).await?;
        let pool = session.pool().clone();

        require_table(&session, &pool, &table).await?;
        let requested = names(&specs);
        if session
            .read(catalog::any_column_exists(&pool, &table, &requested))
            .await?
        {
            return Err(SchemaError::conflict(
                Subject::Column,
                "alreadyExists",
                format!(
                    "some of [{}] already exist on table '{}'",
                    requested.join(", "),
                    table
                ),
            ));
        }
        require_references(&session, &pool, &table, &specs).await?;

        let outcome = session
            .apply(&ddl::add_columns(&table, &specs))
            .await
            .map_err(|e| e.or_conflict(Subject::Column))?;
        session
            .settle(outcome, catalog::all_columns_exist(&pool, &table, &requested))
            .await?;

        session.read(catalog::list_columns(&pool, &table)).await
    }

    /// Change the type of existing columns, and their nullability and default
    /// where given
    pub async fn alter_columns(
        &self,
        ctx: &RequestContext,
        table: &str,
        columns: &[AlterColumnInput],
    ) -> Result<Vec<ColumnDefinition>, SchemaError> {
        let table = validate::table_name(table)?;
        let specs = validate::alter_column_specs(columns)?;

        let mut session = self.engine.open(ctx, "alter_columns", table.to_string()).await?;
        let pool = session.pool().clone();

        require_table(&session, &pool, &table).await?;
        let requested: Vec<&str> = specs.iter().map(|c| c.name.as_str()).collect();
        if !session
            .read(catalog::all_columns_exist(&pool, &table, &requested))
            .await?
        {
            return Err(SchemaError::not_found(
                Subject::Column,
                format!(
                    "some of [{}] do not exist on table '{}'",
                    requested.join(", "),
                    table
                ),
            ));
        }

        let outcome = session.apply(&ddl::alter_columns(&table, &specs)).await?;
        session
            .settle(outcome, async {
                let columns = catalog::list_columns(&pool, &table).await?;
                Ok::<_, sqlx::Error>(alteration_visible(&specs, &columns))
            })
            .await?;

        session.read(catalog::list_columns(&pool, &table)).await
    }

    pub async fn rename_column(
        &self,
        ctx: &RequestContext,
        table: &str,
        column: &str,
        new_name: &str,
    ) -> Result<Vec<ColumnDefinition>, SchemaError> {
        let table = validate::table_name(table)?;
        validate::identifier(column, IdentifierKind::Column)?;
        validate::identifier(new_name, IdentifierKind::Column)?;

        let mut session = self.engine.open(ctx, "rename_column", table.to_string()).await?;
        let pool = session.pool().clone();

        require_table(&session, &pool, &table).await?;
        if !session
            .read(catalog::column_exists(&pool, &table, column))
            .await?
        {
            return Err(SchemaError::not_found(
                Subject::Column,
                format!("column '{}' does not exist on table '{}'", column, table),
            ));
        }
        if session
            .read(catalog::column_exists(&pool, &table, new_name))
            .await?
        {
            return Err(SchemaError::conflict(
                Subject::Column,
                "alreadyExists",
                format!("column '{}' already exists on table '{}'", new_name, table),
            ));
        }

        let outcome = session
            .apply(&[ddl::rename_column(&table, column, new_name)])
            .await
            .map_err(|e| e.or_conflict(Subject::Column))?;
        session
            .settle(outcome, async {
                Ok::<_, sqlx::Error>(
                    catalog::column_exists(&pool, &table, new_name).await?
                        && !catalog::column_exists(&pool, &table, column).await?,
                )
            })
            .await?;

        session.read(catalog::list_columns(&pool, &table)).await
    }

    pub async fn delete_column(
        &self,
        ctx: &RequestContext,
        table: &str,
        column: &str,
    ) -> Result<bool, SchemaError> {
        let table = validate::table_name(table)?;
        validate::identifier(column, IdentifierKind::Column)?;

        let mut session = self.engine.open(ctx, "delete_column", table.to_string()).await?;
        let pool = session.pool().clone();

        require_table(&session, &pool, &table).await?;
        if !session
            .read(catalog::column_exists(&pool, &table, column))
            .await?
        {
            return Err(SchemaError::not_found(
                Subject::Column,
                format!("column '{}' does not exist on table '{}'", column, table),
            ));
        }

        let outcome = session.apply(&[ddl::drop_column(&table, column)]).await?;
        session
            .settle(outcome, async {
                Ok::<_, sqlx::Error>(!catalog::column_exists(&pool, &table, column).await?)
            })
            .await?;

        Ok(true)
    }
}
