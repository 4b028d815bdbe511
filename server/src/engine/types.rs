//! Schema engine types
//!
//! Three families of types live here:
//! - `*Input` structs: structured, unvalidated definitions as received from a caller
//! - `*Spec` structs: validated definitions, the only shapes the DDL builder accepts
//! - `*Definition` / `*Summary` structs: shapes introspected from a tenant catalog
//!
//! Inputs become specs only through the explicit mapping functions in
//! [`crate::engine::validate`].

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::utils::sql::quote_qualified;

/// Schema used when a name is not qualified
pub const DEFAULT_SCHEMA: &str = "public";

// ============================================================================
// Qualified names
// ============================================================================

/// A `schema.name` pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct QualifiedName {
    pub schema: String,
    pub name: String,
}

impl QualifiedName {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
        }
    }

    /// Parse `schema.name` or `name` (schema defaults to `public`).
    ///
    /// Only the first dot separates schema from name; any further dots stay in
    /// the name and are rejected later by identifier validation.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        match raw.split_once('.') {
            Some((schema, name)) => Self::new(schema, name),
            None => Self::new(DEFAULT_SCHEMA, raw),
        }
    }

    /// Same schema, different name
    pub fn with_name(&self, name: impl Into<String>) -> Self {
        Self::new(self.schema.clone(), name)
    }

    /// Quoted form for DDL (`"schema"."name"`)
    pub fn quoted(&self) -> String {
        quote_qualified(&self.schema, &self.name)
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.name)
    }
}

impl From<String> for QualifiedName {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<QualifiedName> for String {
    fn from(name: QualifiedName) -> Self {
        name.to_string()
    }
}

// ============================================================================
// Closed vocabularies
// ============================================================================

/// Column type allow-list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Int,
    Serial,
    Varchar,
    Text,
    Boolean,
    Date,
    Timestamp,
    Float,
    Uuid,
    Json,
}

impl ColumnType {
    pub const ALL: [ColumnType; 10] = [
        ColumnType::Int,
        ColumnType::Serial,
        ColumnType::Varchar,
        ColumnType::Text,
        ColumnType::Boolean,
        ColumnType::Date,
        ColumnType::Timestamp,
        ColumnType::Float,
        ColumnType::Uuid,
        ColumnType::Json,
    ];

    /// Vocabulary name as accepted from callers
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Serial => "serial",
            Self::Varchar => "varchar",
            Self::Text => "text",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::Timestamp => "timestamp",
            Self::Float => "float",
            Self::Uuid => "uuid",
            Self::Json => "json",
        }
    }

    /// PostgreSQL type emitted into DDL
    pub fn sql(&self) -> &'static str {
        match self {
            Self::Int => "INTEGER",
            Self::Serial => "SERIAL",
            Self::Varchar => "VARCHAR",
            Self::Text => "TEXT",
            Self::Boolean => "BOOLEAN",
            Self::Date => "DATE",
            Self::Timestamp => "TIMESTAMP",
            Self::Float => "DOUBLE PRECISION",
            Self::Uuid => "UUID",
            Self::Json => "JSONB",
        }
    }

    /// Exact (case-insensitive) vocabulary lookup. Never a pass-through.
    pub fn parse(s: &str) -> Option<Self> {
        let lower = s.to_ascii_lowercase();
        Self::ALL.into_iter().find(|t| t.as_str() == lower)
    }

    /// Map a `format_type()` rendering back to the vocabulary
    pub fn from_catalog(formatted: &str, default: Option<&str>) -> Option<Self> {
        let formatted = formatted.trim();
        match formatted {
            "integer" => {
                if default.is_some_and(|d| d.starts_with("nextval(")) {
                    Some(Self::Serial)
                } else {
                    Some(Self::Int)
                }
            }
            "text" => Some(Self::Text),
            "boolean" => Some(Self::Boolean),
            "date" => Some(Self::Date),
            "timestamp without time zone" => Some(Self::Timestamp),
            "double precision" => Some(Self::Float),
            "uuid" => Some(Self::Uuid),
            "jsonb" | "json" => Some(Self::Json),
            f if f == "character varying" || f.starts_with("character varying(") => {
                Some(Self::Varchar)
            }
            _ => None,
        }
    }

}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Label a catalog type for output: vocabulary name when recognised, verbatim otherwise
pub fn catalog_type_label(formatted: &str, default: Option<&str>) -> String {
    ColumnType::from_catalog(formatted, default)
        .map(|t| t.as_str().to_string())
        .unwrap_or_else(|| formatted.to_string())
}

/// Function return type allow-list (column vocabulary plus `void` and `trigger`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnType {
    Column(ColumnType),
    Void,
    Trigger,
}

impl ReturnType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "void" => Some(Self::Void),
            "trigger" => Some(Self::Trigger),
            // SERIAL is a column shorthand, not a type a function can return
            "serial" => None,
            other => ColumnType::parse(other).map(Self::Column),
        }
    }

    pub fn sql(&self) -> &'static str {
        match self {
            Self::Column(t) => t.sql(),
            Self::Void => "VOID",
            Self::Trigger => "TRIGGER",
        }
    }
}

/// Procedural language allow-list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionLanguage {
    Plpgsql,
    Sql,
}

impl FunctionLanguage {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "plpgsql" => Some(Self::Plpgsql),
            "sql" => Some(Self::Sql),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Plpgsql => "plpgsql",
            Self::Sql => "sql",
        }
    }
}

/// Index access method allow-list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IndexMethod {
    #[default]
    Btree,
    Hash,
    Gin,
    Gist,
    Brin,
}

impl IndexMethod {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "btree" => Some(Self::Btree),
            "hash" => Some(Self::Hash),
            "gin" => Some(Self::Gin),
            "gist" => Some(Self::Gist),
            "brin" => Some(Self::Brin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Btree => "btree",
            Self::Hash => "hash",
            Self::Gin => "gin",
            Self::Gist => "gist",
            Self::Brin => "brin",
        }
    }
}

/// Default keywords that may be emitted unquoted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultKeyword {
    Now,
    CurrentTimestamp,
    CurrentDate,
    GenRandomUuid,
    True,
    False,
    Null,
}

impl DefaultKeyword {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "now()" => Some(Self::Now),
            "current_timestamp" => Some(Self::CurrentTimestamp),
            "current_date" => Some(Self::CurrentDate),
            "gen_random_uuid()" => Some(Self::GenRandomUuid),
            "true" => Some(Self::True),
            "false" => Some(Self::False),
            "null" => Some(Self::Null),
            _ => None,
        }
    }

    pub fn sql(&self) -> &'static str {
        match self {
            Self::Now => "now()",
            Self::CurrentTimestamp => "CURRENT_TIMESTAMP",
            Self::CurrentDate => "CURRENT_DATE",
            Self::GenRandomUuid => "gen_random_uuid()",
            Self::True => "TRUE",
            Self::False => "FALSE",
            Self::Null => "NULL",
        }
    }
}

/// A validated column default
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefaultValue {
    Keyword(DefaultKeyword),
    /// Numeric literal, already checked against `^-?[0-9]+(\.[0-9]+)?$`
    Number(String),
    /// String literal, quoted by the builder
    Text(String),
}

// ============================================================================
// Inputs (unvalidated)
// ============================================================================

fn default_true() -> bool {
    true
}

/// Column as supplied by a caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInput {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    #[serde(default = "default_true")]
    pub nullable: bool,
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub primary: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub foreign: bool,
    #[serde(default)]
    pub reference_table: Option<String>,
    #[serde(default)]
    pub reference_column: Option<String>,
}

impl ColumnInput {
    /// Nullable column of the given type with no flags
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable: true,
            default: None,
            primary: false,
            unique: false,
            foreign: false,
            reference_table: None,
            reference_column: None,
        }
    }
}

/// Distinguishes an explicit `null` from an absent field
fn present<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

/// Column alteration as supplied by a caller
///
/// Only what is present changes: `nullable` absent keeps the current
/// nullability, `default` absent keeps the current default and
/// `"default": null` drops it. Key and reference flags are part of the shape
/// only so that they can be rejected instead of silently ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlterColumnInput {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub default: Option<Option<String>>,
    #[serde(default)]
    pub primary: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub foreign: bool,
}

impl AlterColumnInput {
    /// Type change only
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable: None,
            default: None,
            primary: false,
            unique: false,
            foreign: false,
        }
    }
}

/// Function parameter as supplied by a caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionParamInput {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
}

/// Index as supplied by a caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexInput {
    pub name: String,
    pub columns: Vec<String>,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub method: Option<String>,
}

/// Function as supplied by a caller; `name` may be schema-qualified
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionInput {
    pub name: String,
    #[serde(default)]
    pub params: Vec<FunctionParamInput>,
    pub returns: String,
    pub language: String,
    pub body: String,
}

// ============================================================================
// Specs (validated)
// ============================================================================

/// Foreign key target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    pub table: QualifiedName,
    pub column: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: String,
    pub data_type: ColumnType,
    pub nullable: bool,
    pub default: Option<DefaultValue>,
    pub primary: bool,
    pub unique: bool,
    pub reference: Option<ForeignKey>,
}

/// Validated alteration; `None` leaves that property as it is
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlterColumnSpec {
    pub name: String,
    pub data_type: ColumnType,
    pub nullable: Option<bool>,
    pub default: Option<Option<DefaultValue>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSpec {
    pub name: QualifiedName,
    pub columns: Vec<ColumnSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    pub name: String,
    pub table: QualifiedName,
    pub columns: Vec<String>,
    pub unique: bool,
    pub method: IndexMethod,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionParam {
    pub name: String,
    pub data_type: ColumnType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSpec {
    pub name: QualifiedName,
    pub params: Vec<FunctionParam>,
    pub returns: ReturnType,
    pub language: FunctionLanguage,
    pub body: String,
}

// ============================================================================
// Introspected shapes
// ============================================================================

/// Column as it exists in the tenant catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDefinition {
    pub name: String,
    /// 1-based position among live (non-dropped) columns
    pub position: u32,
    pub nullable: bool,
    pub data_type: String,
    pub default: Option<String>,
    pub primary: bool,
    pub unique: bool,
    pub foreign: bool,
    pub reference_table: Option<String>,
    pub reference_column: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableDefinition {
    pub name: QualifiedName,
    pub columns: Vec<ColumnDefinition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableSummary {
    pub schema: String,
    pub name: String,
    pub column_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexDefinition {
    pub name: String,
    pub table: QualifiedName,
    pub columns: Vec<String>,
    pub unique: bool,
    pub method: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionParamDefinition {
    pub name: String,
    pub data_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionDefinition {
    pub schema: String,
    pub name: String,
    pub params: Vec<FunctionParamDefinition>,
    pub returns: String,
    pub language: String,
    pub body: String,
    /// Full `CREATE OR REPLACE FUNCTION` rendering from `pg_get_functiondef`
    pub definition: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionSummary {
    pub schema: String,
    pub name: String,
    pub arguments: String,
    pub returns: String,
    pub language: String,
}
