//! Schema commands
//!
//! One serde-tagged value per engine operation, so a whole request can be
//! read from JSON and dispatched without a per-operation entry point.
//!
//! ```json
//! {"op": "add_columns", "table": "public.users", "columns": [{"name": "age", "type": "int"}]}
//! ```

use serde::{Deserialize, Serialize};

use super::error::SchemaError;
use super::types::{
    AlterColumnInput, ColumnDefinition, ColumnInput, FunctionDefinition, FunctionInput,
    FunctionSummary, IndexDefinition, IndexInput, TableDefinition, TableSummary,
};
use super::{RequestContext, SchemaEngine};

fn default_schema() -> String {
    super::types::DEFAULT_SCHEMA.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum SchemaCommand {
    ListTables {
        #[serde(default = "default_schema")]
        schema: String,
    },
    GetTable {
        table: String,
    },
    CreateTable {
        table: String,
        columns: Vec<ColumnInput>,
    },
    RenameTable {
        table: String,
        new_name: String,
    },
    DuplicateTable {
        table: String,
        target: String,
        #[serde(default)]
        with_data: bool,
    },
    DeleteTable {
        table: String,
    },
    ListColumns {
        table: String,
    },
    AddColumns {
        table: String,
        columns: Vec<ColumnInput>,
    },
    AlterColumns {
        table: String,
        columns: Vec<AlterColumnInput>,
    },
    RenameColumn {
        table: String,
        column: String,
        new_name: String,
    },
    DeleteColumn {
        table: String,
        column: String,
    },
    ListIndexes {
        table: String,
    },
    GetIndex {
        table: String,
        name: String,
    },
    GetIndexDefinition {
        table: String,
        name: String,
    },
    CreateIndex {
        table: String,
        index: IndexInput,
    },
    DeleteIndex {
        table: String,
        name: String,
    },
    ListFunctions {
        #[serde(default = "default_schema")]
        schema: String,
    },
    GetFunction {
        name: String,
    },
    CreateFunction {
        function: FunctionInput,
    },
    UpdateFunction {
        function: FunctionInput,
    },
    DeleteFunction {
        name: String,
    },
}

impl SchemaCommand {
    /// Operation name, as used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::ListTables { .. } => "list_tables",
            Self::GetTable { .. } => "get_table",
            Self::CreateTable { .. } => "create_table",
            Self::RenameTable { .. } => "rename_table",
            Self::DuplicateTable { .. } => "duplicate_table",
            Self::DeleteTable { .. } => "delete_table",
            Self::ListColumns { .. } => "list_columns",
            Self::AddColumns { .. } => "add_columns",
            Self::AlterColumns { .. } => "alter_columns",
            Self::RenameColumn { .. } => "rename_column",
            Self::DeleteColumn { .. } => "delete_column",
            Self::ListIndexes { .. } => "list_indexes",
            Self::GetIndex { .. } => "get_index",
            Self::GetIndexDefinition { .. } => "get_index_definition",
            Self::CreateIndex { .. } => "create_index",
            Self::DeleteIndex { .. } => "delete_index",
            Self::ListFunctions { .. } => "list_functions",
            Self::GetFunction { .. } => "get_function",
            Self::CreateFunction { .. } => "create_function",
            Self::UpdateFunction { .. } => "update_function",
            Self::DeleteFunction { .. } => "delete_function",
        }
    }

    /// True for commands that change the tenant schema
    pub fn is_mutation(&self) -> bool {
        !matches!(
            self,
            Self::ListTables { .. }
                | Self::GetTable { .. }
                | Self::ListColumns { .. }
                | Self::ListIndexes { .. }
                | Self::GetIndex { .. }
                | Self::GetIndexDefinition { .. }
                | Self::ListFunctions { .. }
                | Self::GetFunction { .. }
        )
    }
}

/// Result of a dispatched command, serialized without a wrapper
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum CommandOutput {
    Tables(Vec<TableSummary>),
    Table(TableDefinition),
    Columns(Vec<ColumnDefinition>),
    IndexNames(Vec<String>),
    Index(IndexDefinition),
    IndexDefinitionText(String),
    Functions(Vec<FunctionSummary>),
    Function(FunctionDefinition),
    Deleted { deleted: bool },
}

impl SchemaEngine {
    /// Dispatch a command onto the matching service
    pub async fn execute(
        &self,
        ctx: &RequestContext,
        command: &SchemaCommand,
    ) -> Result<CommandOutput, SchemaError> {
        let output = match command {
            SchemaCommand::ListTables { schema } => {
                CommandOutput::Tables(self.tables().list_tables(ctx, schema).await?)
            }
            SchemaCommand::GetTable { table } => {
                CommandOutput::Table(self.tables().get_table(ctx, table).await?)
            }
            SchemaCommand::CreateTable { table, columns } => {
                CommandOutput::Table(self.tables().create_table(ctx, table, columns).await?)
            }
            SchemaCommand::RenameTable { table, new_name } => {
                CommandOutput::Table(self.tables().rename_table(ctx, table, new_name).await?)
            }
            SchemaCommand::DuplicateTable {
                table,
                target,
                with_data,
            } => CommandOutput::Table(
                self.tables()
                    .duplicate_table(ctx, table, target, *with_data)
                    .await?,
            ),
            SchemaCommand::DeleteTable { table } => CommandOutput::Deleted {
                deleted: self.tables().delete_table(ctx, table).await?,
            },
            SchemaCommand::ListColumns { table } => {
                CommandOutput::Columns(self.columns().list_columns(ctx, table).await?)
            }
            SchemaCommand::AddColumns { table, columns } => {
                CommandOutput::Columns(self.columns().add_columns(ctx, table, columns).await?)
            }
            SchemaCommand::AlterColumns { table, columns } => {
                CommandOutput::Columns(self.columns().alter_columns(ctx, table, columns).await?)
            }
            SchemaCommand::RenameColumn {
                table,
                column,
                new_name,
            } => CommandOutput::Columns(
                self.columns()
                    .rename_column(ctx, table, column, new_name)
                    .await?,
            ),
            SchemaCommand::DeleteColumn { table, column } => CommandOutput::Deleted {
                deleted: self.columns().delete_column(ctx, table, column).await?,
            },
            SchemaCommand::ListIndexes { table } => {
                CommandOutput::IndexNames(self.indexes().list_indexes(ctx, table).await?)
            }
            SchemaCommand::GetIndex { table, name } => {
                CommandOutput::Index(self.indexes().get_index(ctx, table, name).await?)
            }
            SchemaCommand::GetIndexDefinition { table, name } => {
                CommandOutput::IndexDefinitionText(
                    self.indexes().get_index_definition(ctx, table, name).await?,
                )
            }
            SchemaCommand::CreateIndex { table, index } => {
                CommandOutput::Index(self.indexes().create_index(ctx, table, index).await?)
            }
            SchemaCommand::DeleteIndex { table, name } => CommandOutput::Deleted {
                deleted: self.indexes().delete_index(ctx, table, name).await?,
            },
            SchemaCommand::ListFunctions { schema } => {
                CommandOutput::Functions(self.functions().list_functions(ctx, schema).await?)
            }
            SchemaCommand::GetFunction { name } => {
                CommandOutput::Function(self.functions().get_function(ctx, name).await?)
            }
            SchemaCommand::CreateFunction { function } => {
                CommandOutput::Function(self.functions().create_function(ctx, function).await?)
            }
            SchemaCommand::UpdateFunction { function } => {
                CommandOutput::Function(self.functions().update_function(ctx, function).await?)
            }
            SchemaCommand::DeleteFunction { name } => CommandOutput::Deleted {
                deleted: self.functions().delete_function(ctx, name).await?,
            },
        };
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use serde_json::json;
    use uuid::Uuid;

    use super::*;
    use crate::data::memory::MemoryProjects;
    use crate::engine::router::tests::offline_router;

    #[test]
    fn test_deserialize_create_table() {
        let command: SchemaCommand = serde_json::from_value(json!({
            "op": "create_table",
            "table": "users",
            "columns": [
                {"name": "id", "type": "serial", "primary": true},
                {"name": "email", "type": "varchar", "nullable": false, "unique": true}
            ]
        }))
        .unwrap();

        let SchemaCommand::CreateTable { table, columns } = &command else {
            panic!("expected create_table");
        };
        assert_eq!(table, "users");
        assert_eq!(columns.len(), 2);
        assert!(columns[0].primary);
        assert!(columns[0].nullable);
        assert!(!columns[1].nullable);
        assert_eq!(command.name(), "create_table");
        assert!(command.is_mutation());
    }

    #[test]
    fn test_list_commands_default_to_public() {
        let command: SchemaCommand =
            serde_json::from_value(json!({"op": "list_tables"})).unwrap();
        assert_eq!(
            command,
            SchemaCommand::ListTables {
                schema: "public".to_string()
            }
        );
        assert!(!command.is_mutation());

        let command: SchemaCommand =
            serde_json::from_value(json!({"op": "list_functions", "schema": "app"})).unwrap();
        assert_eq!(
            command,
            SchemaCommand::ListFunctions {
                schema: "app".to_string()
            }
        );
    }

    #[test]
    fn test_deserialize_alter_keeps_unset_properties() {
        let command: SchemaCommand = serde_json::from_value(json!({
            "op": "alter_columns",
            "table": "orders",
            "columns": [{"name": "created_at", "type": "date"}]
        }))
        .unwrap();
        assert_eq!(
            command,
            SchemaCommand::AlterColumns {
                table: "orders".to_string(),
                columns: vec![AlterColumnInput::new("created_at", "date")],
            }
        );
    }

    #[test]
    fn test_unknown_op_is_rejected() {
        let result: Result<SchemaCommand, _> =
            serde_json::from_value(json!({"op": "truncate_table", "table": "users"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_output_serializes_without_wrapper() {
        let value = serde_json::to_value(CommandOutput::Deleted { deleted: true }).unwrap();
        assert_eq!(value, json!({"deleted": true}));

        let value = serde_json::to_value(CommandOutput::IndexNames(vec![
            "users_pkey".to_string(),
        ]))
        .unwrap();
        assert_eq!(value, json!(["users_pkey"]));
    }

    #[tokio::test]
    async fn test_execute_dispatches_to_services() {
        let projects = Arc::new(MemoryProjects::new());
        let engine =
            SchemaEngine::new(Arc::new(offline_router(projects.clone())), Duration::from_secs(5));
        let ctx = RequestContext::new(Uuid::new_v4());

        let command: SchemaCommand = serde_json::from_value(json!({
            "op": "add_columns",
            "table": "users",
            "columns": [{"name": "oid", "type": "int"}]
        }))
        .unwrap();
        let err = engine.execute(&ctx, &command).await.unwrap_err();
        assert_eq!(err.key(), "column.error.invalidName");

        let command = SchemaCommand::DeleteIndex {
            table: "users".to_string(),
            name: "users_email_idx".to_string(),
        };
        let err = engine.execute(&ctx, &command).await.unwrap_err();
        assert_eq!(err.key(), "project.error.notFound");
        assert_eq!(projects.calls(), 1);
    }
}
