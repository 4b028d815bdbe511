use clap::{Parser, Subcommand};

use std::path::PathBuf;

use uuid::Uuid;

use super::constants::{
    ENV_CONFIG, ENV_CONTROL_URL, ENV_DEBUG, ENV_OPERATION_TIMEOUT_SECS,
    ENV_TENANT_DATABASE_PREFIX,
};

#[derive(Parser)]
#[command(name = "basalt")]
#[command(version, about = "Multi-tenant dynamic schema engine", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable debug mode (logs every DDL statement)
    #[arg(long, global = true, env = ENV_DEBUG)]
    pub debug: bool,

    /// Path to config file
    #[arg(long, short = 'c', global = true, env = ENV_CONFIG)]
    pub config: Option<PathBuf>,

    /// Control-plane PostgreSQL connection URL
    #[arg(long, global = true, env = ENV_CONTROL_URL)]
    pub control_url: Option<String>,

    /// Prefix for physical tenant database names
    #[arg(long, global = true, env = ENV_TENANT_DATABASE_PREFIX)]
    pub tenant_database_prefix: Option<String>,

    /// Default deadline for schema operations in seconds
    #[arg(long, global = true, env = ENV_OPERATION_TIMEOUT_SECS)]
    pub operation_timeout_secs: Option<u64>,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Apply pending control-plane migrations and print the schema version
    Migrate,
    /// Provision, remove and list projects
    Project {
        #[command(subcommand)]
        command: ProjectCommands,
    },
    /// Read the live schema of a project's database
    Inspect {
        /// Project ID
        #[arg(long)]
        project: Uuid,
        #[command(subcommand)]
        command: InspectCommands,
    },
    /// Run one schema command (JSON) against a project's database
    Apply {
        /// Project ID
        #[arg(long)]
        project: Uuid,
        /// Read the command from a JSON file
        #[arg(long, required_unless_present = "json", conflicts_with = "json")]
        file: Option<PathBuf>,
        /// Command as inline JSON
        #[arg(long)]
        json: Option<String>,
        /// Deadline for this command in seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
}

#[derive(Subcommand, Clone, Debug)]
pub enum ProjectCommands {
    /// Create a project and its physical database
    Create {
        /// Owning organization ID
        #[arg(long)]
        org: String,
        /// Display name
        #[arg(long)]
        name: String,
    },
    /// Drop a project's physical database and remove the project
    Delete {
        /// Project ID
        id: Uuid,
    },
    /// List projects
    List {
        /// Only projects owned by this organization
        #[arg(long)]
        org: Option<String>,
    },
}

#[derive(Subcommand, Clone, Debug)]
pub enum InspectCommands {
    /// Tables in a schema
    Tables {
        #[arg(long, default_value = "public")]
        schema: String,
    },
    /// Columns of a table (`schema.table` or `table`)
    Columns { table: String },
    /// Index names on a table
    Indexes { table: String },
    /// One index: structure plus PostgreSQL's own definition
    Index { table: String, name: String },
    /// Functions in a schema
    Functions {
        #[arg(long, default_value = "public")]
        schema: String,
    },
    /// One function (`schema.name` or `name`)
    Function { name: String },
}

/// Configuration derived from CLI arguments
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub debug: bool,
    pub config: Option<PathBuf>,
    pub control_url: Option<String>,
    pub tenant_database_prefix: Option<String>,
    pub operation_timeout_secs: Option<u64>,
}

impl From<&Cli> for CliConfig {
    fn from(cli: &Cli) -> Self {
        Self {
            debug: cli.debug,
            config: cli.config.clone(),
            control_url: cli.control_url.clone(),
            tenant_database_prefix: cli.tenant_database_prefix.clone(),
            operation_timeout_secs: cli.operation_timeout_secs,
        }
    }
}

/// Parse CLI arguments and return config with command
pub fn parse() -> (CliConfig, Option<Commands>) {
    let cli = Cli::parse();
    let config = CliConfig::from(&cli);
    (config, cli.command)
}
