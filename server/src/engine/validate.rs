//! Identifier and type validation
//!
//! Pure, deterministic checks that gate every name, type, default and body
//! before it can reach the DDL builder. Nothing in here performs I/O.
//!
//! Single checks ([`validate_identifier`], [`validate_type`]) stop at the first
//! failing rule. The mapping functions at the bottom of the module turn caller
//! inputs into specs and collect every failure in a batch so they can be
//! reported together.

use std::collections::HashSet;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use super::types::{
    AlterColumnInput, AlterColumnSpec, ColumnInput, ColumnSpec, ColumnType, DefaultKeyword, DefaultValue, ForeignKey, FunctionInput,
    FunctionLanguage, FunctionParam, FunctionSpec, IndexInput, IndexMethod, IndexSpec,
    QualifiedName, ReturnType, TableSpec,
};

/// Dollar-quote tag used for function bodies
pub const BODY_TAG: &str = "$basalt$";

static RELATION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("Invalid regex"));

static SYMBOL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_-]*$").expect("Invalid regex"));

static NUMBER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?[0-9]+(\.[0-9]+)?$").expect("Invalid regex"));

static PLPGSQL_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)\bbegin\b.*\bend\b").expect("Invalid regex"));

const RESERVED_TABLES: &[&str] = &["pg_catalog", "information_schema"];
const RESERVED_COLUMNS: &[&str] = &["oid", "xmin", "cmin", "xmax", "cmax", "tableoid"];
const RESERVED_INDEXES: &[&str] = &["primary", "unique", "foreign", "exclude"];
const RESERVED_SCHEMAS: &[&str] = &["pg_catalog", "information_schema"];

// ============================================================================
// Kinds, subjects and reasons
// ============================================================================

/// What an identifier names; selects bounds, pattern and reserved set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierKind {
    Table,
    Column,
    Index,
    Function,
    FunctionParam,
    Schema,
}

impl IdentifierKind {
    /// Inclusive `(min, max)` length in characters
    pub fn bounds(&self) -> (usize, usize) {
        match self {
            Self::Table | Self::Index | Self::Function => (3, 60),
            Self::Column => (2, 60),
            Self::FunctionParam | Self::Schema => (1, 60),
        }
    }

    fn pattern(&self) -> &'static Regex {
        match self {
            Self::Table | Self::Index => &RELATION_PATTERN,
            Self::Column | Self::Function | Self::FunctionParam | Self::Schema => &SYMBOL_PATTERN,
        }
    }

    fn is_reserved(&self, name: &str) -> bool {
        let lower = name.to_ascii_lowercase();
        let set: &[&str] = match self {
            Self::Table => RESERVED_TABLES,
            Self::Column => RESERVED_COLUMNS,
            Self::Index => RESERVED_INDEXES,
            Self::Schema => {
                if lower.starts_with("pg_") {
                    return true;
                }
                RESERVED_SCHEMAS
            }
            Self::Function | Self::FunctionParam => &[],
        };
        set.contains(&lower.as_str())
    }

    /// Error-key subject this kind reports under
    pub fn subject(&self) -> Subject {
        match self {
            Self::Table => Subject::Table,
            Self::Column => Subject::Column,
            Self::Index => Subject::Index,
            Self::Function | Self::FunctionParam => Subject::Function,
            Self::Schema => Subject::Schema,
        }
    }
}

/// Object family used as the first segment of error keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subject {
    Table,
    Column,
    Index,
    Function,
    Schema,
}

impl Subject {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Table => "table",
            Self::Column => "column",
            Self::Index => "index",
            Self::Function => "function",
            Self::Schema => "schema",
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectionReason {
    Empty,
    TooShort { min: usize, len: usize },
    TooLong { max: usize, len: usize },
    InvalidCharacters,
    Reserved,
    UnknownType(String),
    UnknownLanguage(String),
    UnknownMethod(String),
    InvalidDefault(String),
    InvalidBody(&'static str),
    MissingReference,
    /// Flag that only applies when a column is created
    UnsupportedAlteration(&'static str),
    EmptyBatch,
    EmptyColumns,
    DuplicateName,
    DuplicateColumn,
}

impl RejectionReason {
    /// Last segment of the machine-stable error key
    pub fn code(&self) -> &'static str {
        match self {
            Self::Empty
            | Self::TooShort { .. }
            | Self::TooLong { .. }
            | Self::InvalidCharacters
            | Self::Reserved => "invalidName",
            Self::UnknownType(_) => "invalidType",
            Self::UnknownLanguage(_) => "invalidLanguage",
            Self::UnknownMethod(_) => "invalidMethod",
            Self::InvalidDefault(_) => "invalidDefault",
            Self::InvalidBody(_) => "invalidBody",
            Self::MissingReference => "invalidReference",
            Self::UnsupportedAlteration(_) => "unsupportedAlteration",
            Self::EmptyBatch => "emptyBatch",
            Self::EmptyColumns => "emptyColumns",
            Self::DuplicateName => "duplicateName",
            Self::DuplicateColumn => "duplicateColumn",
        }
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "must not be empty"),
            Self::TooShort { min, len } => {
                write!(f, "is {} characters, minimum is {}", len, min)
            }
            Self::TooLong { max, len } => write!(f, "is {} characters, maximum is {}", len, max),
            Self::InvalidCharacters => write!(
                f,
                "may only contain letters, digits, underscore and dash"
            ),
            Self::Reserved => write!(f, "is a reserved name"),
            Self::UnknownType(t) => write!(f, "type '{}' is not supported", t),
            Self::UnknownLanguage(l) => write!(f, "language '{}' is not supported", l),
            Self::UnknownMethod(m) => write!(f, "index method '{}' is not supported", m),
            Self::InvalidDefault(d) => write!(f, "default '{}' is not valid for this type", d),
            Self::InvalidBody(why) => write!(f, "body {}", why),
            Self::MissingReference => {
                write!(f, "foreign key needs a reference table and column")
            }
            Self::UnsupportedAlteration(flag) => {
                write!(f, "cannot change '{}' on an existing column", flag)
            }
            Self::EmptyBatch => write!(f, "at least one column is required"),
            Self::EmptyColumns => write!(f, "at least one column is required"),
            Self::DuplicateName => write!(f, "is declared more than once"),
            Self::DuplicateColumn => write!(f, "is listed more than once"),
        }
    }
}

/// One failed check, attributed to the object that failed it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub subject: Subject,
    pub target: String,
    pub reason: RejectionReason,
}

impl Rejection {
    pub fn new(subject: Subject, target: impl Into<String>, reason: RejectionReason) -> Self {
        Self {
            subject,
            target: target.into(),
            reason,
        }
    }

    pub fn key(&self) -> String {
        format!("{}.error.{}", self.subject, self.reason.code())
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}' {}", self.subject, self.target, self.reason)
    }
}

/// Every rejection found while validating one request, in input order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors(Vec<Rejection>);

impl ValidationErrors {
    pub fn rejections(&self) -> &[Rejection] {
        &self.0
    }

    /// Key of the first rejection
    pub fn key(&self) -> String {
        self.0
            .first()
            .map(Rejection::key)
            .unwrap_or_else(|| "validation.error".to_string())
    }

    fn check(rejections: Vec<Rejection>) -> Result<(), Self> {
        if rejections.is_empty() {
            Ok(())
        } else {
            Err(Self(rejections))
        }
    }
}

impl From<Rejection> for ValidationErrors {
    fn from(rejection: Rejection) -> Self {
        Self(vec![rejection])
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, r) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", r)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

// ============================================================================
// Single checks
// ============================================================================

/// Check one identifier: non-empty, length bounds, pattern, reserved set
pub fn validate_identifier(name: &str, kind: IdentifierKind) -> Result<(), RejectionReason> {
    if name.is_empty() {
        return Err(RejectionReason::Empty);
    }

    let len = name.chars().count();
    let (min, max) = kind.bounds();
    if len < min {
        return Err(RejectionReason::TooShort { min, len });
    }
    if len > max {
        return Err(RejectionReason::TooLong { max, len });
    }

    if !kind.pattern().is_match(name) {
        return Err(RejectionReason::InvalidCharacters);
    }

    if kind.is_reserved(name) {
        return Err(RejectionReason::Reserved);
    }

    Ok(())
}

/// Check a column type against the closed vocabulary
pub fn validate_type(type_name: &str) -> Result<ColumnType, RejectionReason> {
    ColumnType::parse(type_name).ok_or_else(|| RejectionReason::UnknownType(type_name.to_string()))
}

/// Turn a raw default into a value the builder can render safely
pub fn validate_default(data_type: ColumnType, raw: &str) -> Result<DefaultValue, RejectionReason> {
    let invalid = || RejectionReason::InvalidDefault(raw.to_string());
    let keyword = DefaultKeyword::parse(raw);

    if keyword == Some(DefaultKeyword::Null) && data_type != ColumnType::Serial {
        return Ok(DefaultValue::Keyword(DefaultKeyword::Null));
    }

    match data_type {
        ColumnType::Serial => Err(invalid()),
        ColumnType::Int => {
            let v = raw.trim();
            if NUMBER_PATTERN.is_match(v) && !v.contains('.') {
                Ok(DefaultValue::Number(v.to_string()))
            } else {
                Err(invalid())
            }
        }
        ColumnType::Float => {
            let v = raw.trim();
            if NUMBER_PATTERN.is_match(v) {
                Ok(DefaultValue::Number(v.to_string()))
            } else {
                Err(invalid())
            }
        }
        ColumnType::Boolean => match keyword {
            Some(k @ (DefaultKeyword::True | DefaultKeyword::False)) => Ok(DefaultValue::Keyword(k)),
            _ => Err(invalid()),
        },
        ColumnType::Timestamp | ColumnType::Date => match keyword {
            Some(
                k @ (DefaultKeyword::Now
                | DefaultKeyword::CurrentTimestamp
                | DefaultKeyword::CurrentDate),
            ) => Ok(DefaultValue::Keyword(k)),
            Some(_) => Err(invalid()),
            None => Ok(DefaultValue::Text(raw.to_string())),
        },
        ColumnType::Uuid => match keyword {
            Some(DefaultKeyword::GenRandomUuid) => {
                Ok(DefaultValue::Keyword(DefaultKeyword::GenRandomUuid))
            }
            Some(_) => Err(invalid()),
            None => Ok(DefaultValue::Text(raw.to_string())),
        },
        ColumnType::Varchar | ColumnType::Text | ColumnType::Json => {
            Ok(DefaultValue::Text(raw.to_string()))
        }
    }
}

/// Check that a body is paired for its language and cannot break out of its quoting
pub fn validate_body(language: FunctionLanguage, body: &str) -> Result<(), RejectionReason> {
    if body.trim().is_empty() {
        return Err(RejectionReason::InvalidBody("must not be empty"));
    }
    if body.contains(BODY_TAG) {
        return Err(RejectionReason::InvalidBody("must not contain the $basalt$ tag"));
    }

    match language {
        FunctionLanguage::Plpgsql => {
            if PLPGSQL_BLOCK.is_match(body) {
                Ok(())
            } else {
                Err(RejectionReason::InvalidBody("needs a BEGIN ... END block"))
            }
        }
        FunctionLanguage::Sql => {
            if parentheses_balanced(body) {
                Ok(())
            } else {
                Err(RejectionReason::InvalidBody("has unbalanced parentheses or quotes"))
            }
        }
    }
}

/// Paren depth returns to zero and never goes negative
///
/// Characters inside single-quoted literals (`''` escapes a quote) and
/// `--` line comments are not counted.
fn parentheses_balanced(body: &str) -> bool {
    let mut depth: i64 = 0;
    let mut chars = body.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\'' => loop {
                match chars.next() {
                    Some('\'') if chars.peek() == Some(&'\'') => {
                        chars.next();
                    }
                    Some('\'') => break,
                    Some(_) => {}
                    None => return false,
                }
            },
            '-' if chars.peek() == Some(&'-') => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
            }
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

// ============================================================================
// Mapping: inputs -> specs
// ============================================================================

fn check_name(
    rejections: &mut Vec<Rejection>,
    name: &str,
    kind: IdentifierKind,
) -> bool {
    match validate_identifier(name, kind) {
        Ok(()) => true,
        Err(reason) => {
            rejections.push(Rejection::new(kind.subject(), name, reason));
            false
        }
    }
}

fn check_qualified(
    rejections: &mut Vec<Rejection>,
    name: &QualifiedName,
    kind: IdentifierKind,
) {
    check_name(rejections, &name.schema, IdentifierKind::Schema);
    check_name(rejections, &name.name, kind);
}

/// Parse and validate a schema-qualified table name
pub fn table_name(raw: &str) -> Result<QualifiedName, ValidationErrors> {
    let name = QualifiedName::parse(raw);
    let mut rejections = Vec::new();
    check_qualified(&mut rejections, &name, IdentifierKind::Table);
    ValidationErrors::check(rejections)?;
    Ok(name)
}

/// Parse and validate a schema-qualified function name
pub fn function_name(raw: &str) -> Result<QualifiedName, ValidationErrors> {
    let name = QualifiedName::parse(raw);
    let mut rejections = Vec::new();
    check_qualified(&mut rejections, &name, IdentifierKind::Function);
    ValidationErrors::check(rejections)?;
    Ok(name)
}

/// Validate a bare identifier of the given kind
pub fn identifier(name: &str, kind: IdentifierKind) -> Result<(), ValidationErrors> {
    validate_identifier(name, kind)
        .map_err(|reason| Rejection::new(kind.subject(), name, reason).into())
}

fn map_column(rejections: &mut Vec<Rejection>, input: &ColumnInput) -> Option<ColumnSpec> {
    let before = rejections.len();
    let column = |reason| Rejection::new(Subject::Column, input.name.as_str(), reason);

    check_name(rejections, &input.name, IdentifierKind::Column);

    let data_type = match validate_type(&input.data_type) {
        Ok(t) => Some(t),
        Err(reason) => {
            rejections.push(column(reason));
            None
        }
    };

    let default = match (data_type, input.default.as_deref()) {
        (Some(t), Some(raw)) => match validate_default(t, raw) {
            Ok(v) => Some(v),
            Err(reason) => {
                rejections.push(column(reason));
                None
            }
        },
        _ => None,
    };

    let reference = if input.foreign {
        match (&input.reference_table, &input.reference_column) {
            (Some(table), Some(col)) => {
                let table = QualifiedName::parse(table);
                check_qualified(rejections, &table, IdentifierKind::Table);
                check_name(rejections, col, IdentifierKind::Column);
                Some(ForeignKey {
                    table,
                    column: col.clone(),
                })
            }
            _ => {
                rejections.push(column(RejectionReason::MissingReference));
                None
            }
        }
    } else {
        None
    };

    if rejections.len() > before {
        return None;
    }

    Some(ColumnSpec {
        name: input.name.clone(),
        data_type: data_type?,
        nullable: input.nullable && !input.primary,
        default,
        primary: input.primary,
        unique: input.unique,
        reference,
    })
}

fn map_columns(
    rejections: &mut Vec<Rejection>,
    columns: &[ColumnInput],
) -> Vec<ColumnSpec> {
    if columns.is_empty() {
        rejections.push(Rejection::new(
            Subject::Column,
            "",
            RejectionReason::EmptyBatch,
        ));
        return Vec::new();
    }

    let mut seen = HashSet::new();
    let mut specs = Vec::with_capacity(columns.len());
    for input in columns {
        if !seen.insert(input.name.to_ascii_lowercase()) {
            rejections.push(Rejection::new(
                Subject::Column,
                input.name.as_str(),
                RejectionReason::DuplicateName,
            ));
            continue;
        }
        if let Some(spec) = map_column(rejections, input) {
            specs.push(spec);
        }
    }
    specs
}

/// Map a create-table request; every column is checked before returning
pub fn table_spec(raw_name: &str, columns: &[ColumnInput]) -> Result<TableSpec, ValidationErrors> {
    let name = QualifiedName::parse(raw_name);
    let mut rejections = Vec::new();
    check_qualified(&mut rejections, &name, IdentifierKind::Table);
    let columns = map_columns(&mut rejections, columns);
    ValidationErrors::check(rejections)?;
    Ok(TableSpec { name, columns })
}

/// Map a batch of columns for add or alter; the whole batch fails together
pub fn column_specs(columns: &[ColumnInput]) -> Result<Vec<ColumnSpec>, ValidationErrors> {
    let mut rejections = Vec::new();
    let specs = map_columns(&mut rejections, columns);
    ValidationErrors::check(rejections)?;
    Ok(specs)
}

/// Map a batch of column alterations
///
/// `serial` is a creation shorthand, not a target type. Key and reference
/// flags cannot be changed here and are rejected rather than dropped.
pub fn alter_column_specs(
    columns: &[AlterColumnInput],
) -> Result<Vec<AlterColumnSpec>, ValidationErrors> {
    let mut rejections = Vec::new();
    if columns.is_empty() {
        rejections.push(Rejection::new(
            Subject::Column,
            "",
            RejectionReason::EmptyBatch,
        ));
    }

    let mut seen = HashSet::new();
    let mut specs = Vec::with_capacity(columns.len());
    for input in columns {
        if !seen.insert(input.name.to_ascii_lowercase()) {
            rejections.push(Rejection::new(
                Subject::Column,
                input.name.as_str(),
                RejectionReason::DuplicateName,
            ));
            continue;
        }

        let before = rejections.len();
        let column = |reason| Rejection::new(Subject::Column, input.name.as_str(), reason);
        check_name(&mut rejections, &input.name, IdentifierKind::Column);

        for (set, flag) in [
            (input.primary, "primary"),
            (input.unique, "unique"),
            (input.foreign, "foreign"),
        ] {
            if set {
                rejections.push(column(RejectionReason::UnsupportedAlteration(flag)));
            }
        }

        let data_type = match validate_type(&input.data_type) {
            Ok(ColumnType::Serial) => {
                rejections.push(column(RejectionReason::UnknownType(input.data_type.clone())));
                continue;
            }
            Ok(t) => t,
            Err(reason) => {
                rejections.push(column(reason));
                continue;
            }
        };

        let default = match &input.default {
            Some(Some(raw)) => match validate_default(data_type, raw) {
                Ok(v) => Some(Some(v)),
                Err(reason) => {
                    rejections.push(column(reason));
                    None
                }
            },
            Some(None) => Some(None),
            None => None,
        };

        if rejections.len() == before {
            specs.push(AlterColumnSpec {
                name: input.name.clone(),
                data_type,
                nullable: input.nullable,
                default,
            });
        }
    }

    ValidationErrors::check(rejections)?;
    Ok(specs)
}

/// Map a create-index request
pub fn index_spec(table: &QualifiedName, input: &IndexInput) -> Result<IndexSpec, ValidationErrors> {
    let mut rejections = Vec::new();
    check_name(&mut rejections, &input.name, IdentifierKind::Index);

    if input.columns.is_empty() {
        rejections.push(Rejection::new(
            Subject::Index,
            input.name.as_str(),
            RejectionReason::EmptyColumns,
        ));
    }

    let mut seen = HashSet::new();
    for column in &input.columns {
        if check_name(&mut rejections, column, IdentifierKind::Column)
            && !seen.insert(column.to_ascii_lowercase())
        {
            rejections.push(Rejection::new(
                Subject::Index,
                column.as_str(),
                RejectionReason::DuplicateColumn,
            ));
        }
    }

    let method = match input.method.as_deref() {
        None => IndexMethod::default(),
        Some(m) => IndexMethod::parse(m).unwrap_or_else(|| {
            rejections.push(Rejection::new(
                Subject::Index,
                input.name.as_str(),
                RejectionReason::UnknownMethod(m.to_string()),
            ));
            IndexMethod::default()
        }),
    };

    ValidationErrors::check(rejections)?;
    Ok(IndexSpec {
        name: input.name.clone(),
        table: table.clone(),
        columns: input.columns.clone(),
        unique: input.unique,
        method,
    })
}

/// Map a create/update-function request
pub fn function_spec(input: &FunctionInput) -> Result<FunctionSpec, ValidationErrors> {
    let name = QualifiedName::parse(&input.name);
    let mut rejections = Vec::new();
    check_qualified(&mut rejections, &name, IdentifierKind::Function);
    let function = |reason| Rejection::new(Subject::Function, name.name.as_str(), reason);

    let mut seen = HashSet::new();
    let mut params = Vec::with_capacity(input.params.len());
    for param in &input.params {
        if check_name(&mut rejections, &param.name, IdentifierKind::FunctionParam)
            && !seen.insert(param.name.to_ascii_lowercase())
        {
            rejections.push(Rejection::new(
                Subject::Function,
                param.name.as_str(),
                RejectionReason::DuplicateName,
            ));
        }
        match validate_type(&param.data_type) {
            Ok(data_type) => params.push(FunctionParam {
                name: param.name.clone(),
                data_type,
            }),
            Err(reason) => rejections.push(Rejection::new(
                Subject::Function,
                param.name.as_str(),
                reason,
            )),
        }
    }

    let returns = ReturnType::parse(&input.returns);
    if returns.is_none() {
        rejections.push(function(RejectionReason::UnknownType(input.returns.clone())));
    }

    let language = FunctionLanguage::parse(&input.language);
    match language {
        Some(language) => {
            if let Err(reason) = validate_body(language, &input.body) {
                rejections.push(function(reason));
            }
        }
        None => rejections.push(function(RejectionReason::UnknownLanguage(
            input.language.clone(),
        ))),
    }

    match (returns, language) {
        (Some(returns), Some(language)) if rejections.is_empty() => Ok(FunctionSpec {
            name,
            params,
            returns,
            language,
            body: input.body.clone(),
        }),
        _ => Err(ValidationErrors(rejections)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::types::FunctionParamInput;

    fn reject(name: &str, kind: IdentifierKind) -> RejectionReason {
        validate_identifier(name, kind).unwrap_err()
    }

    #[test]
    fn test_identifier_length_bounds() {
        let cases = [
            (IdentifierKind::Table, "ab", "abc"),
            (IdentifierKind::Column, "a", "ab"),
            (IdentifierKind::Index, "ix", "idx"),
            (IdentifierKind::Function, "fn", "fn1"),
            (IdentifierKind::FunctionParam, "", "p"),
        ];
        for (kind, too_short, shortest) in cases {
            assert!(validate_identifier(too_short, kind).is_err(), "{kind:?}");
            assert!(validate_identifier(shortest, kind).is_ok(), "{kind:?}");
            assert!(validate_identifier(&"a".repeat(60), kind).is_ok(), "{kind:?}");
            assert_eq!(
                reject(&"a".repeat(61), kind),
                RejectionReason::TooLong { max: 60, len: 61 }
            );
        }
    }

    #[test]
    fn test_identifier_empty_is_first_rule() {
        assert_eq!(reject("", IdentifierKind::Table), RejectionReason::Empty);
        assert_eq!(reject("", IdentifierKind::Column), RejectionReason::Empty);
    }

    #[test]
    fn test_identifier_rejects_whitespace_and_punctuation() {
        for name in ["my table", "users;", "a\"b", "tab\tle", "x.y", "drop(", "naïve"] {
            assert_eq!(
                reject(name, IdentifierKind::Table),
                RejectionReason::InvalidCharacters,
                "{name}"
            );
        }
    }

    #[test]
    fn test_identifier_leading_digit() {
        assert!(validate_identifier("2024_sales", IdentifierKind::Table).is_ok());
        assert_eq!(
            reject("1col", IdentifierKind::Column),
            RejectionReason::InvalidCharacters
        );
        assert_eq!(
            reject("9fn", IdentifierKind::Function),
            RejectionReason::InvalidCharacters
        );
    }

    #[test]
    fn test_identifier_reserved_sets() {
        assert_eq!(reject("pg_catalog", IdentifierKind::Table), RejectionReason::Reserved);
        assert_eq!(
            reject("INFORMATION_SCHEMA", IdentifierKind::Table),
            RejectionReason::Reserved
        );
        for name in ["oid", "xmin", "cmin", "xmax", "cmax", "tableoid", "OID"] {
            assert_eq!(reject(name, IdentifierKind::Column), RejectionReason::Reserved);
        }
        for name in ["primary", "unique", "foreign", "exclude"] {
            assert_eq!(reject(name, IdentifierKind::Index), RejectionReason::Reserved);
        }
        assert_eq!(reject("pg_temp", IdentifierKind::Schema), RejectionReason::Reserved);
        assert!(validate_identifier("oid", IdentifierKind::Table).is_ok());
    }

    #[test]
    fn test_identifier_accepts_valid_names() {
        assert!(validate_identifier("order-items", IdentifierKind::Table).is_ok());
        assert!(validate_identifier("created_at", IdentifierKind::Column).is_ok());
        assert!(validate_identifier("_private", IdentifierKind::Column).is_ok());
        assert!(validate_identifier("idx_users_email", IdentifierKind::Index).is_ok());
        assert!(validate_identifier("public", IdentifierKind::Schema).is_ok());
    }

    #[test]
    fn test_validate_type_closed_list() {
        for t in [
            "int",
            "serial",
            "varchar",
            "text",
            "boolean",
            "date",
            "timestamp",
            "float",
            "uuid",
            "json",
        ] {
            assert!(validate_type(t).is_ok(), "{t}");
        }
        for t in [
            "int); DROP TABLE x; --",
            "integer",
            "bigint",
            "varchar(255)",
            "",
            "text[]",
        ] {
            assert!(validate_type(t).is_err(), "{t}");
        }
    }

    #[test]
    fn test_validate_default() {
        assert_eq!(
            validate_default(ColumnType::Int, "42"),
            Ok(DefaultValue::Number("42".into()))
        );
        assert!(validate_default(ColumnType::Int, "4.2").is_err());
        assert!(validate_default(ColumnType::Int, "1; DROP TABLE x").is_err());
        assert_eq!(
            validate_default(ColumnType::Float, "-0.5"),
            Ok(DefaultValue::Number("-0.5".into()))
        );
        assert_eq!(
            validate_default(ColumnType::Boolean, "TRUE"),
            Ok(DefaultValue::Keyword(DefaultKeyword::True))
        );
        assert!(validate_default(ColumnType::Boolean, "yes").is_err());
        assert_eq!(
            validate_default(ColumnType::Timestamp, "now()"),
            Ok(DefaultValue::Keyword(DefaultKeyword::Now))
        );
        assert_eq!(
            validate_default(ColumnType::Text, "it's"),
            Ok(DefaultValue::Text("it's".into()))
        );
        assert_eq!(
            validate_default(ColumnType::Text, "null"),
            Ok(DefaultValue::Keyword(DefaultKeyword::Null))
        );
        assert!(validate_default(ColumnType::Serial, "1").is_err());
        assert!(validate_default(ColumnType::Uuid, "true").is_err());
    }

    #[test]
    fn test_validate_body() {
        assert!(validate_body(FunctionLanguage::Plpgsql, "BEGIN RETURN 1; END;").is_ok());
        assert!(validate_body(FunctionLanguage::Plpgsql, "begin\n  null;\nend").is_ok());
        assert!(validate_body(FunctionLanguage::Plpgsql, "RETURN 1;").is_err());
        assert!(validate_body(FunctionLanguage::Plpgsql, "END; BEGIN").is_err());
        assert!(validate_body(FunctionLanguage::Sql, "SELECT count(*) FROM t").is_ok());
        assert!(validate_body(FunctionLanguage::Sql, "SELECT (1").is_err());
        assert!(validate_body(FunctionLanguage::Sql, "SELECT 1)(").is_err());
        assert!(validate_body(FunctionLanguage::Sql, "SELECT ':)'").is_ok());
        assert!(validate_body(FunctionLanguage::Sql, "SELECT 'it''s (' || x").is_ok());
        assert!(validate_body(FunctionLanguage::Sql, "SELECT x -- close ) later\n").is_ok());
        assert!(validate_body(FunctionLanguage::Sql, "SELECT (x -- )\n").is_err());
        assert!(validate_body(FunctionLanguage::Sql, "SELECT 'open").is_err());
        assert!(validate_body(FunctionLanguage::Sql, "  ").is_err());
        assert!(
            validate_body(FunctionLanguage::Sql, "SELECT 1 $basalt$; DROP TABLE x").is_err()
        );
    }

    #[test]
    fn test_table_spec_collects_every_rejection() {
        let columns = vec![
            ColumnInput::new("id", "serial"),
            ColumnInput::new("oid", "int"),
            ColumnInput::new("name", "int); DROP TABLE x; --"),
        ];
        let err = table_spec("public.users", &columns).unwrap_err();
        let targets: Vec<_> = err.rejections().iter().map(|r| r.target.as_str()).collect();
        assert_eq!(targets, vec!["oid", "name"]);
        assert_eq!(err.key(), "column.error.invalidName");
        assert_eq!(err.rejections()[1].key(), "column.error.invalidType");
    }

    #[test]
    fn test_table_spec_maps_columns_in_order() {
        let mut id = ColumnInput::new("id", "serial");
        id.primary = true;
        let mut email = ColumnInput::new("email", "varchar");
        email.nullable = false;
        email.unique = true;
        let spec = table_spec("users", &[id, email]).unwrap();
        assert_eq!(spec.name, QualifiedName::new("public", "users"));
        assert_eq!(spec.columns.len(), 2);
        assert_eq!(spec.columns[0].name, "id");
        assert!(spec.columns[0].primary);
        assert!(!spec.columns[0].nullable);
        assert_eq!(spec.columns[1].data_type, ColumnType::Varchar);
        assert!(spec.columns[1].unique);
    }

    #[test]
    fn test_table_spec_rejects_bad_schema() {
        let err = table_spec("pg_toast.users", &[ColumnInput::new("id", "int")]).unwrap_err();
        assert_eq!(err.key(), "schema.error.invalidName");
    }

    #[test]
    fn test_column_specs_empty_and_duplicates() {
        assert_eq!(
            column_specs(&[]).unwrap_err().key(),
            "column.error.emptyBatch"
        );
        let err = column_specs(&[
            ColumnInput::new("email", "text"),
            ColumnInput::new("Email", "text"),
        ])
        .unwrap_err();
        assert_eq!(err.key(), "column.error.duplicateName");
        assert_eq!(err.rejections()[0].target, "Email");
    }

    #[test]
    fn test_column_specs_identifies_second_column() {
        let err = column_specs(&[
            ColumnInput::new("first", "text"),
            ColumnInput::new("second", "money"),
            ColumnInput::new("third", "text"),
        ])
        .unwrap_err();
        assert_eq!(err.rejections().len(), 1);
        assert_eq!(err.rejections()[0].target, "second");
    }

    #[test]
    fn test_alter_rejects_serial() {
        let err = alter_column_specs(&[AlterColumnInput::new("id", "serial")]).unwrap_err();
        assert_eq!(err.key(), "column.error.invalidType");
        assert!(alter_column_specs(&[AlterColumnInput::new("id", "int")]).is_ok());
    }

    #[test]
    fn test_alter_type_only_leaves_constraints_alone() {
        let specs = alter_column_specs(&[AlterColumnInput::new("created_at", "date")]).unwrap();
        assert_eq!(specs[0].data_type, ColumnType::Date);
        assert_eq!(specs[0].nullable, None);
        assert_eq!(specs[0].default, None);

        let mut age = AlterColumnInput::new("age", "int");
        age.nullable = Some(false);
        age.default = Some(Some("7".into()));
        let mut note = AlterColumnInput::new("note", "text");
        note.default = Some(None);
        let specs = alter_column_specs(&[age, note]).unwrap();
        assert_eq!(specs[0].nullable, Some(false));
        assert_eq!(specs[0].default, Some(Some(DefaultValue::Number("7".into()))));
        assert_eq!(specs[1].default, Some(None));

        let mut bad = AlterColumnInput::new("age", "int");
        bad.default = Some(Some("seven".into()));
        assert_eq!(
            alter_column_specs(&[bad]).unwrap_err().key(),
            "column.error.invalidDefault"
        );
        assert_eq!(
            alter_column_specs(&[]).unwrap_err().key(),
            "column.error.emptyBatch"
        );
    }

    #[test]
    fn test_alter_rejects_key_and_reference_flags() {
        let mut id = AlterColumnInput::new("id", "int");
        id.primary = true;
        let mut email = AlterColumnInput::new("email", "text");
        email.unique = true;
        let mut user_id = AlterColumnInput::new("user_id", "int");
        user_id.foreign = true;

        let err = alter_column_specs(&[id, email, user_id]).unwrap_err();
        let targets: Vec<_> = err.rejections().iter().map(|r| r.target.as_str()).collect();
        assert_eq!(targets, vec!["id", "email", "user_id"]);
        assert_eq!(err.key(), "column.error.unsupportedAlteration");
        assert_eq!(
            err.rejections()[0].to_string(),
            "column 'id' cannot change 'primary' on an existing column"
        );
    }

    #[test]
    fn test_foreign_key_requires_reference() {
        let mut col = ColumnInput::new("user_id", "int");
        col.foreign = true;
        assert_eq!(
            column_specs(std::slice::from_ref(&col)).unwrap_err().key(),
            "column.error.invalidReference"
        );

        col.reference_table = Some("crm.users".into());
        col.reference_column = Some("id".into());
        let specs = column_specs(&[col]).unwrap();
        let fk = specs[0].reference.as_ref().unwrap();
        assert_eq!(fk.table, QualifiedName::new("crm", "users"));
        assert_eq!(fk.column, "id");
    }

    #[test]
    fn test_index_spec() {
        let table = QualifiedName::new("public", "users");
        let input = IndexInput {
            name: "idx_users_email".into(),
            columns: vec!["email".into()],
            unique: true,
            method: Some("HASH".into()),
        };
        let spec = index_spec(&table, &input).unwrap();
        assert_eq!(spec.method, IndexMethod::Hash);
        assert!(spec.unique);

        let bad = IndexInput {
            name: "primary".into(),
            columns: vec!["email".into(), "email".into()],
            unique: false,
            method: Some("rtree".into()),
        };
        let keys: Vec<_> = index_spec(&table, &bad)
            .unwrap_err()
            .rejections()
            .iter()
            .map(Rejection::key)
            .collect();
        assert_eq!(
            keys,
            vec![
                "index.error.invalidName",
                "index.error.duplicateColumn",
                "index.error.invalidMethod"
            ]
        );

        let empty = IndexInput {
            name: "idx_empty".into(),
            columns: vec![],
            unique: false,
            method: None,
        };
        assert_eq!(
            index_spec(&table, &empty).unwrap_err().key(),
            "index.error.emptyColumns"
        );
    }

    #[test]
    fn test_function_spec() {
        let input = FunctionInput {
            name: "billing.add_tax".into(),
            params: vec![FunctionParamInput {
                name: "amount".into(),
                data_type: "float".into(),
            }],
            returns: "float".into(),
            language: "plpgsql".into(),
            body: "BEGIN RETURN amount * 1.2; END;".into(),
        };
        let spec = function_spec(&input).unwrap();
        assert_eq!(spec.name, QualifiedName::new("billing", "add_tax"));
        assert_eq!(spec.returns, ReturnType::Column(ColumnType::Float));
        assert_eq!(spec.params[0].data_type, ColumnType::Float);

        let bad = FunctionInput {
            returns: "setof record".into(),
            language: "plv8".into(),
            ..input
        };
        let keys: Vec<_> = function_spec(&bad)
            .unwrap_err()
            .rejections()
            .iter()
            .map(Rejection::key)
            .collect();
        assert_eq!(
            keys,
            vec!["function.error.invalidType", "function.error.invalidLanguage"]
        );
    }

    #[test]
    fn test_rejection_display() {
        let r = Rejection::new(Subject::Column, "oid", RejectionReason::Reserved);
        assert_eq!(r.to_string(), "column 'oid' is a reserved name");
    }
}
