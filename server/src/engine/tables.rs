//! Table operations

use super::error::SchemaError;
use super::types::{ColumnInput, TableDefinition, TableSummary};
use super::validate::{self, IdentifierKind, Subject};
use super::{
    RequestContext, SchemaEngine, catalog, ddl, describe_table, require_references,
    require_schema, require_table,
};

pub struct TableService {
    engine: SchemaEngine,
}

impl TableService {
    pub fn new(engine: SchemaEngine) -> Self {
        Self { engine }
    }

    pub async fn list_tables(
        &self,
        ctx: &RequestContext,
        schema: &str,
    ) -> Result<Vec<TableSummary>, SchemaError> {
        validate::identifier(schema, IdentifierKind::Schema)?;

        let session = self.engine.open(ctx, "list_tables", schema).await?;
        let pool = session.pool().clone();
        require_schema(&session, &pool, schema).await?;
        session.read(catalog::list_tables(&pool, schema)).await
    }

    pub async fn get_table(
        &self,
        ctx: &RequestContext,
        table: &str,
    ) -> Result<TableDefinition, SchemaError> {
        let table = validate::table_name(table)?;

        let session = self.engine.open(ctx, "get_table", table.to_string()).await?;
        let pool = session.pool().clone();
        require_table(&session, &pool, &table).await?;
        describe_table(&session, &pool, &table).await
    }

    /// Create a table and return its introspected shape
    pub async fn create_table(
        &self,
        ctx: &RequestContext,
        table: &str,
        columns: &[ColumnInput],
    ) -> Result<TableDefinition, SchemaError> {
        let spec = validate::table_spec(table, columns)?;

        let mut session = self
            .engine
            .open(ctx, "create_table", spec.name.to_string())
            .await?;
        let pool = session.pool().clone();

        require_schema(&session, &pool, &spec.name.schema).await?;
        if session
            .read(catalog::relation_exists(&pool, &spec.name))
            .await?
        {
            return Err(SchemaError::conflict(
                Subject::Table,
                "alreadyExists",
                format!("table '{}' already exists", spec.name),
            ));
        }
        require_references(&session, &pool, &spec.name, &spec.columns).await?;

        let outcome = session
            .apply(&[ddl::create_table(&spec)])
            .await
            .map_err(|e| e.or_conflict(Subject::Table))?;
        session
            .settle(outcome, catalog::table_exists(&pool, &spec.name))
            .await?;

        describe_table(&session, &pool, &spec.name).await
    }

    /// Rename within the same schema
    pub async fn rename_table(
        &self,
        ctx: &RequestContext,
        table: &str,
        new_name: &str,
    ) -> Result<TableDefinition, SchemaError> {
        let table = validate::table_name(table)?;
        validate::identifier(new_name, IdentifierKind::Table)?;
        let renamed = table.with_name(new_name);

        let mut session = self
            .engine
            .open(ctx, "rename_table", table.to_string())
            .await?;
        let pool = session.pool().clone();

        require_table(&session, &pool, &table).await?;
        if session.read(catalog::relation_exists(&pool, &renamed)).await? {
            return Err(SchemaError::conflict(
                Subject::Table,
                "alreadyExists",
                format!("table '{}' already exists", renamed),
            ));
        }

        let outcome = session
            .apply(&[ddl::rename_table(&table, new_name)])
            .await
            .map_err(|e| e.or_conflict(Subject::Table))?;
        session
            .settle(outcome, async {
                Ok::<_, sqlx::Error>(
                    catalog::table_exists(&pool, &renamed).await?
                        && !catalog::table_exists(&pool, &table).await?,
                )
            })
            .await?;

        describe_table(&session, &pool, &renamed).await
    }

    /// Copy a table's structure, and rows when `with_data` is set
    pub async fn duplicate_table(
        &self,
        ctx: &RequestContext,
        table: &str,
        target: &str,
        with_data: bool,
    ) -> Result<TableDefinition, SchemaError> {
        let source = validate::table_name(table)?;
        let target = validate::table_name(target)?;

        let mut session = self
            .engine
            .open(ctx, "duplicate_table", source.to_string())
            .await?;
        let pool = session.pool().clone();

        require_table(&session, &pool, &source).await?;
        require_schema(&session, &pool, &target.schema).await?;
        if session.read(catalog::relation_exists(&pool, &target)).await? {
            return Err(SchemaError::conflict(
                Subject::Table,
                "alreadyExists",
                format!("table '{}' already exists", target),
            ));
        }

        let outcome = session
            .apply(&[ddl::duplicate_table(&source, &target, with_data)])
            .await
            .map_err(|e| e.or_conflict(Subject::Table))?;
        session
            .settle(outcome, catalog::table_exists(&pool, &target))
            .await?;

        describe_table(&session, &pool, &target).await
    }

    pub async fn delete_table(&self, ctx: &RequestContext, table: &str) -> Result<bool, SchemaError> {
        let table = validate::table_name(table)?;

        let mut session = self
            .engine
            .open(ctx, "delete_table", table.to_string())
            .await?;
        let pool = session.pool().clone();

        require_table(&session, &pool, &table).await?;

        let outcome = session.apply(&[ddl::drop_table(&table)]).await?;
        session
            .settle(outcome, async {
                Ok::<_, sqlx::Error>(!catalog::table_exists(&pool, &table).await?)
            })
            .await?;

        Ok(true)
    }
}
