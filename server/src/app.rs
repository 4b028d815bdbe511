//! Core application

use std::fmt::Display;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;
use uuid::Uuid;

use crate::core::cli::{self, CliConfig, Commands, InspectCommands, ProjectCommands};
use crate::core::config::AppConfig;
use crate::core::constants::{APP_NAME_LOWER, ENV_LOG};
use crate::core::shutdown::ShutdownService;
use crate::data::{PostgresService, ProjectRepository};
use crate::domain::projects::{CreateProjectRequest, ProjectError, ProjectService};
use crate::engine::{RequestContext, SchemaCommand, SchemaEngine, SchemaError, TenantRouter};
use crate::utils::file::read_expanded;

pub struct CoreApp {
    pub shutdown: ShutdownService,
    pub config: AppConfig,
    pub postgres: Arc<PostgresService>,
    pub router: Arc<TenantRouter>,
    pub engine: SchemaEngine,
    pub projects: ProjectService,
}

fn schema_error(e: SchemaError) -> anyhow::Error {
    tracing::debug!(kind = e.kind().as_str(), key = %e.key(), "Schema operation failed");
    keyed(e.key(), e)
}

fn project_error(e: ProjectError) -> anyhow::Error {
    keyed(e.key(), e)
}

/// Error carrying its machine-stable key in front of the message
fn keyed(key: impl Display, err: impl Display) -> anyhow::Error {
    anyhow::anyhow!("[{}] {}", key, err)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn read_command(file: Option<&Path>, json: Option<&str>) -> Result<SchemaCommand> {
    let text = match (file, json) {
        (Some(path), _) => read_expanded(path)
            .with_context(|| format!("Failed to read command file: {}", path.display()))?,
        (None, Some(json)) => json.to_string(),
        (None, None) => anyhow::bail!("Either --file or --json is required"),
    };
    serde_json::from_str(&text).context("Invalid schema command")
}

fn inspect_command(command: InspectCommands) -> SchemaCommand {
    match command {
        InspectCommands::Tables { schema } => SchemaCommand::ListTables { schema },
        InspectCommands::Columns { table } => SchemaCommand::ListColumns { table },
        InspectCommands::Indexes { table } => SchemaCommand::ListIndexes { table },
        InspectCommands::Index { table, name } => SchemaCommand::GetIndex { table, name },
        InspectCommands::Functions { schema } => SchemaCommand::ListFunctions { schema },
        InspectCommands::Function { name } => SchemaCommand::GetFunction { name },
    }
}

impl CoreApp {
    /// Run the application with CLI argument parsing
    pub async fn run() -> Result<()> {
        dotenvy::dotenv().ok();

        let (cli_config, command) = cli::parse();
        Self::init_logging(cli_config.debug);

        tracing::debug!("Application starting");
        tracing::trace!(command = ?command, "Parsed command");

        let Some(command) = command else {
            anyhow::bail!("No command given, run `{} --help` for usage", APP_NAME_LOWER);
        };

        let app = Self::init(&cli_config).await?;
        app.shutdown.install_signal_handlers();
        app.shutdown
            .register(
                app.postgres
                    .start_health_check_task(app.shutdown.subscribe()),
            )
            .await;

        let result = tokio::select! {
            result = app.dispatch(command) => result,
            _ = app.shutdown.wait() => Err(anyhow::anyhow!("Interrupted")),
        };

        app.shutdown.shutdown().await;
        result
    }

    async fn init(cli: &CliConfig) -> Result<Self> {
        let config = AppConfig::load(cli)?;
        config.require_control_url()?;

        let postgres = Arc::new(
            PostgresService::init(&config.control)
                .await
                .context("Failed to initialize control-plane database")?,
        );

        let repository: Arc<dyn ProjectRepository> = Arc::new(postgres.clone());
        let router = Arc::new(TenantRouter::new(
            repository.clone(),
            postgres.connect_options().clone(),
            postgres.pool().clone(),
            config.tenants.clone(),
        ));
        let engine = SchemaEngine::new(router.clone(), config.tenants.operation_timeout());
        let projects = ProjectService::new(
            repository,
            router.clone(),
            config.tenants.database_prefix.clone(),
        );
        let shutdown = ShutdownService::new(router.clone(), postgres.pool().clone());

        Ok(Self {
            shutdown,
            config,
            postgres,
            router,
            engine,
            projects,
        })
    }

    async fn dispatch(&self, command: Commands) -> Result<()> {
        match command {
            Commands::Migrate => print_json(&serde_json::json!({
                "schema_version": self.postgres.schema_version(),
            })),
            Commands::Project { command } => self.handle_project_command(command).await,
            Commands::Inspect { project, command } => {
                self.handle_inspect_command(project, command).await
            }
            Commands::Apply {
                project,
                file,
                json,
                timeout_secs,
            } => {
                let command = read_command(file.as_deref(), json.as_deref())?;
                let mut ctx = RequestContext::new(project);
                if let Some(secs) = timeout_secs {
                    ctx = ctx.with_timeout(Duration::from_secs(secs));
                }

                tracing::info!(
                    project_id = %project,
                    operation = command.name(),
                    mutation = command.is_mutation(),
                    "Applying schema command"
                );
                let output = self
                    .engine
                    .execute(&ctx, &command)
                    .await
                    .map_err(schema_error)?;
                print_json(&output)
            }
        }
    }

    async fn handle_project_command(&self, command: ProjectCommands) -> Result<()> {
        match command {
            ProjectCommands::Create { org, name } => {
                let request = CreateProjectRequest {
                    name,
                    organization_id: org,
                };
                let project = self
                    .projects
                    .provision(&request)
                    .await
                    .map_err(project_error)?;
                print_json(&project)
            }
            ProjectCommands::Delete { id } => {
                self.projects.deprovision(id).await.map_err(project_error)?;
                print_json(&serde_json::json!({ "deleted": true }))
            }
            ProjectCommands::List { org } => {
                let projects = self
                    .projects
                    .list(org.as_deref())
                    .await
                    .map_err(project_error)?;
                print_json(&projects)
            }
        }
    }

    async fn handle_inspect_command(&self, project: Uuid, command: InspectCommands) -> Result<()> {
        let ctx = RequestContext::new(project);

        if let InspectCommands::Index { table, name } = &command {
            let indexes = self.engine.indexes();
            let index = indexes
                .get_index(&ctx, table, name)
                .await
                .map_err(schema_error)?;
            let definition = indexes
                .get_index_definition(&ctx, table, name)
                .await
                .map_err(schema_error)?;
            return print_json(&serde_json::json!({
                "index": index,
                "definition": definition,
            }));
        }

        let output = self
            .engine
            .execute(&ctx, &inspect_command(command))
            .await
            .map_err(schema_error)?;
        print_json(&output)
    }

    fn init_logging(debug: bool) {
        let default_filter = if debug {
            format!("info,{}=debug", APP_NAME_LOWER)
        } else {
            format!("info,{}=info", APP_NAME_LOWER)
        };

        let filter = std::env::var(ENV_LOG)
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or(default_filter);

        tracing_subscriber::fmt()
            .with_target(false)
            .with_thread_ids(false)
            .with_level(true)
            .with_ansi(true)
            .with_writer(std::io::stderr)
            .compact()
            .with_env_filter(filter)
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_read_command_from_inline_json() {
        let command =
            read_command(None, Some(r#"{"op": "get_table", "table": "users"}"#)).unwrap();
        assert_eq!(
            command,
            SchemaCommand::GetTable {
                table: "users".to_string()
            }
        );
    }

    #[test]
    fn test_read_command_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"op": "delete_function", "name": "app.add_one"}}"#).unwrap();

        let command = read_command(Some(file.path()), None).unwrap();
        assert_eq!(command.name(), "delete_function");
    }

    #[test]
    fn test_read_command_rejects_unknown_op() {
        let err = read_command(None, Some(r#"{"op": "vacuum"}"#)).unwrap_err();
        assert!(err.to_string().contains("Invalid schema command"));
        assert!(read_command(None, None).is_err());
    }

    #[test]
    fn test_inspect_maps_to_read_commands() {
        let command = inspect_command(InspectCommands::Columns {
            table: "public.users".to_string(),
        });
        assert_eq!(command.name(), "list_columns");
        assert!(!command.is_mutation());

        let command = inspect_command(InspectCommands::Function {
            name: "app.add_one".to_string(),
        });
        assert_eq!(command.name(), "get_function");
    }

    #[test]
    fn test_keyed_error_format() {
        let err = keyed("table.error.notFound", "table 'public.users' does not exist");
        assert_eq!(
            err.to_string(),
            "[table.error.notFound] table 'public.users' does not exist"
        );
    }
}
