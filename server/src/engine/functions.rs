//! Stored function operations
//!
//! Functions are addressed by `schema.name`. Overloads created outside the
//! engine are tolerated: reads return the oldest one, update and delete drop
//! all of them.

use super::error::SchemaError;
use super::types::{FunctionDefinition, FunctionInput, FunctionSummary, QualifiedName};
use super::validate::{self, IdentifierKind, Subject};
use super::{RequestContext, SchemaEngine, catalog, ddl, require_schema};

pub struct FunctionService {
    engine: SchemaEngine,
}

fn missing_function(name: &QualifiedName) -> SchemaError {
    SchemaError::not_found(
        Subject::Function,
        format!("function '{}' does not exist", name),
    )
}

impl FunctionService {
    pub fn new(engine: SchemaEngine) -> Self {
        Self { engine }
    }

    pub async fn list_functions(
        &self,
        ctx: &RequestContext,
        schema: &str,
    ) -> Result<Vec<FunctionSummary>, SchemaError> {
        validate::identifier(schema, IdentifierKind::Schema)?;

        let session = self.engine.open(ctx, "list_functions", schema).await?;
        let pool = session.pool().clone();
        require_schema(&session, &pool, schema).await?;
        session.read(catalog::list_functions(&pool, schema)).await
    }

    pub async fn get_function(
        &self,
        ctx: &RequestContext,
        name: &str,
    ) -> Result<FunctionDefinition, SchemaError> {
        let name = validate::function_name(name)?;

        let session = self.engine.open(ctx, "get_function", name.to_string()).await?;
        let pool = session.pool().clone();
        require_schema(&session, &pool, &name.schema).await?;
        session
            .read(catalog::get_function(&pool, &name))
            .await?
            .ok_or_else(|| missing_function(&name))
    }

    pub async fn create_function(
        &self,
        ctx: &RequestContext,
        function: &FunctionInput,
    ) -> Result<FunctionDefinition, SchemaError> {
        let spec = validate::function_spec(function)?;

        let mut session = self
            .engine
            .open(ctx, "create_function", spec.name.to_string())
            .await?;
        let pool = session.pool().clone();

        require_schema(&session, &pool, &spec.name.schema).await?;
        if session.read(catalog::function_exists(&pool, &spec.name)).await? {
            return Err(SchemaError::conflict(
                Subject::Function,
                "alreadyExists",
                format!("function '{}' already exists", spec.name),
            ));
        }

        let outcome = session
            .apply(&[ddl::create_function(&spec)])
            .await
            .map_err(|e| e.or_conflict(Subject::Function))?;
        session
            .settle(outcome, catalog::function_exists(&pool, &spec.name))
            .await?;

        session
            .read(catalog::get_function(&pool, &spec.name))
            .await?
            .ok_or_else(|| missing_function(&spec.name))
    }

    /// Replace a function's signature and body
    ///
    /// Every existing overload is dropped and the new definition created in
    /// the same transaction, so a changed parameter list never leaves the old
    /// signature behind.
    pub async fn update_function(
        &self,
        ctx: &RequestContext,
        function: &FunctionInput,
    ) -> Result<FunctionDefinition, SchemaError> {
        let spec = validate::function_spec(function)?;

        let mut session = self
            .engine
            .open(ctx, "update_function", spec.name.to_string())
            .await?;
        let pool = session.pool().clone();

        require_schema(&session, &pool, &spec.name.schema).await?;
        let signatures = session
            .read(catalog::function_signatures(&pool, &spec.name))
            .await?;
        if signatures.is_empty() {
            return Err(missing_function(&spec.name));
        }

        let mut statements: Vec<String> = signatures
            .iter()
            .map(|args| ddl::drop_function(&spec.name, args))
            .collect();
        statements.push(ddl::create_function(&spec));

        let outcome = session.apply(&statements).await?;
        let expected_body = spec.body.trim_matches('\n');
        session
            .settle(outcome, async {
                let current = catalog::get_function(&pool, &spec.name).await?;
                Ok::<_, sqlx::Error>(current.is_some_and(|f| f.body == expected_body))
            })
            .await?;

        session
            .read(catalog::get_function(&pool, &spec.name))
            .await?
            .ok_or_else(|| missing_function(&spec.name))
    }

    /// Drop a function and all of its overloads
    pub async fn delete_function(&self, ctx: &RequestContext, name: &str) -> Result<bool, SchemaError> {
        let name = validate::function_name(name)?;

        let mut session = self
            .engine
            .open(ctx, "delete_function", name.to_string())
            .await?;
        let pool = session.pool().clone();

        require_schema(&session, &pool, &name.schema).await?;
        let signatures = session
            .read(catalog::function_signatures(&pool, &name))
            .await?;
        if signatures.is_empty() {
            return Err(missing_function(&name));
        }

        let statements: Vec<String> = signatures
            .iter()
            .map(|args| ddl::drop_function(&name, args))
            .collect();
        let outcome = session.apply(&statements).await?;
        session
            .settle(outcome, async {
                Ok::<_, sqlx::Error>(!catalog::function_exists(&pool, &name).await?)
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
    use crate::data::ProjectStatus;
    use crate::data::memory::MemoryProjects;
    use crate::engine::router::tests::offline_router;
    use crate::engine::types::FunctionParamInput;

    fn engine(projects: Arc<MemoryProjects>) -> SchemaEngine {
        SchemaEngine::new(Arc::new(offline_router(projects)), Duration::from_secs(5))
    }

    fn add_one() -> FunctionInput {
        FunctionInput {
            name: "add_one".to_string(),
            params: vec![FunctionParamInput {
                name: "x".to_string(),
                data_type: "int".to_string(),
            }],
            returns: "int".to_string(),
            language: "sql".to_string(),
            body: "SELECT x + 1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_function_validates_before_routing() {
        let projects = Arc::new(MemoryProjects::new());
        let functions = engine(projects.clone()).functions();
        let ctx = RequestContext::new(Uuid::new_v4());

        let mut smuggled = add_one();
        smuggled.body = "SELECT 1 $basalt$; DROP TABLE users; --".to_string();
        let err = functions.create_function(&ctx, &smuggled).await.unwrap_err();
        assert_eq!(err.key(), "function.error.invalidBody");

        let mut python = add_one();
        python.language = "plpython3u".to_string();
        let err = functions.create_function(&ctx, &python).await.unwrap_err();
        assert_eq!(err.key(), "function.error.invalidLanguage");

        let mut setof = add_one();
        setof.returns = "setof record".to_string();
        let err = functions.update_function(&ctx, &setof).await.unwrap_err();
        assert_eq!(err.key(), "function.error.invalidType");

        assert_eq!(projects.calls(), 0);
    }

    #[tokio::test]
    async fn test_function_names_are_validated() {
        let projects = Arc::new(MemoryProjects::new());
        let functions = engine(projects.clone()).functions();
        let ctx = RequestContext::new(Uuid::new_v4());

        let err = functions.get_function(&ctx, "fn").await.unwrap_err();
        assert_eq!(err.key(), "function.error.invalidName");

        let err = functions
            .delete_function(&ctx, "pg_catalog.now")
            .await
            .unwrap_err();
        assert_eq!(err.key(), "schema.error.invalidName");

        let err = functions.list_functions(&ctx, "").await.unwrap_err();
        assert_eq!(err.key(), "schema.error.invalidName");

        assert_eq!(projects.calls(), 0);
    }

    #[tokio::test]
    async fn test_unprovisioned_project_is_rejected() {
        let projects = Arc::new(MemoryProjects::new());
        let id = Uuid::new_v4();
        projects.insert(id, "tenant_a", ProjectStatus::Provisioning);
        let functions = engine(projects.clone()).functions();

        let err = functions
            .create_function(&RequestContext::new(id), &add_one())
            .await
            .unwrap_err();
        assert_eq!(err.key(), "project.error.notProvisioned");
    }
}
