//! Index operations
//!
//! Indexes are addressed through their table; the index name is unique per
//! schema, so a create also conflicts with any other relation of that name.

use sqlx::PgPool;

use super::error::SchemaError;
use super::executor::Session;
use super::types::{IndexDefinition, IndexInput, QualifiedName};
use super::validate::{self, IdentifierKind, Subject};
use super::{RequestContext, SchemaEngine, catalog, ddl, require_table};

pub struct IndexService {
    engine: SchemaEngine,
}

fn missing_index(table: &QualifiedName, name: &str) -> SchemaError {
    SchemaError::not_found(
        Subject::Index,
        format!("index '{}' does not exist on table '{}'", name, table),
    )
}

async fn require_index(
    session: &Session,
    pool: &PgPool,
    table: &QualifiedName,
    name: &str,
) -> Result<(), SchemaError> {
    require_table(session, pool, table).await?;
    if session.read(catalog::index_exists(pool, table, name)).await? {
        Ok(())
    } else {
        Err(missing_index(table, name))
    }
}

impl IndexService {
    pub fn new(engine: SchemaEngine) -> Self {
        Self { engine }
    }

    /// Index names on a table, alphabetical
    pub async fn list_indexes(
        &self,
        ctx: &RequestContext,
        table: &str,
    ) -> Result<Vec<String>, SchemaError> {
        let table = validate::table_name(table)?;

        let session = self.engine.open(ctx, "list_indexes", table.to_string()).await?;
        let pool = session.pool().clone();
        require_table(&session, &pool, &table).await?;
        session.read(catalog::list_indexes(&pool, &table)).await
    }

    pub async fn get_index(
        &self,
        ctx: &RequestContext,
        table: &str,
        name: &str,
    ) -> Result<IndexDefinition, SchemaError> {
        let table = validate::table_name(table)?;
        validate::identifier(name, IdentifierKind::Index)?;

        let session = self.engine.open(ctx, "get_index", table.to_string()).await?;
        let pool = session.pool().clone();
        require_table(&session, &pool, &table).await?;
        session
            .read(catalog::describe_index(&pool, &table, name))
            .await?
            .ok_or_else(|| missing_index(&table, name))
    }

    /// PostgreSQL's `CREATE INDEX` text for an existing index
    pub async fn get_index_definition(
        &self,
        ctx: &RequestContext,
        table: &str,
        name: &str,
    ) -> Result<String, SchemaError> {
        let table = validate::table_name(table)?;
        validate::identifier(name, IdentifierKind::Index)?;

        let session = self
            .engine
            .open(ctx, "get_index_definition", table.to_string())
            .await?;
        let pool = session.pool().clone();
        require_table(&session, &pool, &table).await?;
        session
            .read(catalog::get_index_definition(&pool, &table, name))
            .await?
            .ok_or_else(|| missing_index(&table, name))
    }

    pub async fn create_index(
        &self,
        ctx: &RequestContext,
        table: &str,
        index: &IndexInput,
    ) -> Result<IndexDefinition, SchemaError> {
        let table = validate::table_name(table)?;
        let spec = validate::index_spec(&table, index)?;

        let mut session = self.engine.open(ctx, "create_index", table.to_string()).await?;
        let pool = session.pool().clone();

        require_table(&session, &pool, &table).await?;
        let columns: Vec<&str> = spec.columns.iter().map(String::as_str).collect();
        if !session
            .read(catalog::all_columns_exist(&pool, &table, &columns))
            .await?
        {
            return Err(SchemaError::conflict(
                Subject::Index,
                "columnNotFound",
                format!(
                    "some of [{}] do not exist on table '{}'",
                    columns.join(", "),
                    table
                ),
            ));
        }
        if session
            .read(catalog::relation_exists(&pool, &table.with_name(&spec.name)))
            .await?
        {
            return Err(SchemaError::conflict(
                Subject::Index,
                "alreadyExists",
                format!("index '{}' already exists in schema '{}'", spec.name, table.schema),
            ));
        }

        let outcome = session
            .apply(&[ddl::create_index(&spec)])
            .await
            .map_err(|e| e.or_conflict(Subject::Index))?;
        session
            .settle(outcome, catalog::index_exists(&pool, &table, &spec.name))
            .await?;

        session
            .read(catalog::describe_index(&pool, &table, &spec.name))
            .await?
            .ok_or_else(|| missing_index(&table, &spec.name))
    }

    pub async fn delete_index(
        &self,
        ctx: &RequestContext,
        table: &str,
        name: &str,
    ) -> Result<bool, SchemaError> {
        let table = validate::table_name(table)?;
        validate::identifier(name, IdentifierKind::Index)?;

        let mut session = self.engine.open(ctx, "delete_index", table.to_string()).await?;
        let pool = session.pool().clone();

        require_index(&session, &pool, &table, name).await?;

        let outcome = session
            .apply(&[ddl::drop_index(&table.schema, name)])
            .await?;
        session
            .settle(outcome, async {
                Ok::<_, sqlx::Error>(!catalog::index_exists(&pool, &table, name).await?)
            })
            .await?;

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use uuid::Uuid;

    use super::*;
    use crate::data::memory::MemoryProjects;
    use crate::engine::router::tests::offline_router;

    fn engine(projects: Arc<MemoryProjects>) -> SchemaEngine {
        SchemaEngine::new(Arc::new(offline_router(projects)), Duration::from_secs(5))
    }

    fn index(name: &str, columns: &[&str]) -> IndexInput {
        IndexInput {
            name: name.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            unique: false,
            method: None,
        }
    }

    #[tokio::test]
    async fn test_create_index_validates_before_routing() {
        let projects = Arc::new(MemoryProjects::new());
        let indexes = engine(projects.clone()).indexes();
        let ctx = RequestContext::new(Uuid::new_v4());

        let err = indexes
            .create_index(&ctx, "users", &index("primary", &["id"]))
            .await
            .unwrap_err();
        assert_eq!(err.key(), "index.error.invalidName");

        let err = indexes
            .create_index(&ctx, "users", &index("users_email_idx", &[]))
            .await
            .unwrap_err();
        assert_eq!(err.key(), "index.error.emptyColumns");

        let mut hashed = index("users_email_idx", &["email"]);
        hashed.method = Some("spgist".to_string());
        let err = indexes.create_index(&ctx, "users", &hashed).await.unwrap_err();
        assert_eq!(err.key(), "index.error.invalidMethod");

        assert_eq!(projects.calls(), 0);
    }

    #[tokio::test]
    async fn test_lookups_validate_index_name() {
        let projects = Arc::new(MemoryProjects::new());
        let indexes = engine(projects.clone()).indexes();
        let ctx = RequestContext::new(Uuid::new_v4());

        let err = indexes.get_index(&ctx, "users", "ix").await.unwrap_err();
        assert_eq!(err.key(), "index.error.invalidName");

        let err = indexes
            .delete_index(&ctx, "users", "bad name")
            .await
            .unwrap_err();
        assert_eq!(err.key(), "index.error.invalidName");

        assert_eq!(projects.calls(), 0);
    }

    #[tokio::test]
    async fn test_unknown_project_is_a_routing_error() {
        let projects = Arc::new(MemoryProjects::new());
        let indexes = engine(projects.clone()).indexes();

        let err = indexes
            .list_indexes(&RequestContext::new(Uuid::new_v4()), "users")
            .await
            .unwrap_err();
        assert_eq!(err.key(), "project.error.notFound");
    }

    #[test]
    fn test_missing_index_key() {
        let err = missing_index(&QualifiedName::new("public", "users"), "users_email_idx");
        assert_eq!(err.key(), "index.error.notFound");
    }
}
