//! DDL statement builder
//!
//! Pure functions from validated specs to SQL text. Identifiers cannot be bound
//! as parameters in DDL, so every name is interpolated through
//! [`quote_ident`]/[`QualifiedName::quoted`] and every default literal through
//! [`quote_literal`]. Inputs are expected to have passed
//! [`crate::engine::validate`] already; nothing here re-validates content.

use super::types::{
    AlterColumnSpec, ColumnSpec, DefaultValue, FunctionSpec, IndexSpec, QualifiedName, TableSpec,
};
use super::validate::BODY_TAG;
use crate::utils::sql::{quote_ident, quote_literal};

fn render_default(value: &DefaultValue) -> String {
    match value {
        DefaultValue::Keyword(k) => k.sql().to_string(),
        DefaultValue::Number(n) => n.clone(),
        DefaultValue::Text(t) => quote_literal(t),
    }
}

/// Column clause as used inside CREATE TABLE and ADD COLUMN
fn column_clause(column: &ColumnSpec, inline_primary: bool) -> String {
    let mut clause = format!("{} {}", quote_ident(&column.name), column.data_type.sql());

    if !column.nullable && !(inline_primary && column.primary) {
        clause.push_str(" NOT NULL");
    }
    if let Some(default) = &column.default {
        clause.push_str(" DEFAULT ");
        clause.push_str(&render_default(default));
    }
    if inline_primary && column.primary {
        clause.push_str(" PRIMARY KEY");
    }
    if column.unique && !column.primary {
        clause.push_str(" UNIQUE");
    }
    if let Some(fk) = &column.reference {
        clause.push_str(&format!(
            " REFERENCES {} ({})",
            fk.table.quoted(),
            quote_ident(&fk.column)
        ));
    }
    clause
}

/// `CREATE TABLE` with columns in declaration order
///
/// A single primary column is declared inline; a composite key becomes a
/// table-level `PRIMARY KEY (..)` constraint.
pub fn create_table(spec: &TableSpec) -> String {
    let primary: Vec<&ColumnSpec> = spec.columns.iter().filter(|c| c.primary).collect();
    let inline_primary = primary.len() == 1;

    let mut clauses: Vec<String> = spec
        .columns
        .iter()
        .map(|c| column_clause(c, inline_primary))
        .collect();

    if primary.len() > 1 {
        let names: Vec<String> = primary.iter().map(|c| quote_ident(&c.name)).collect();
        clauses.push(format!("PRIMARY KEY ({})", names.join(", ")));
    }

    format!("CREATE TABLE {} ({})", spec.name.quoted(), clauses.join(", "))
}

/// One `ALTER TABLE .. ADD COLUMN` per column
pub fn add_columns(table: &QualifiedName, columns: &[ColumnSpec]) -> Vec<String> {
    columns
        .iter()
        .map(|c| format!("ALTER TABLE {} ADD COLUMN {}", table.quoted(), column_clause(c, true)))
        .collect()
}

/// Type change for each column, plus nullability and default when requested
///
/// No `USING` expression is synthesized; incompatible casts are left for
/// PostgreSQL to reject.
pub fn alter_columns(table: &QualifiedName, columns: &[AlterColumnSpec]) -> Vec<String> {
    let table = table.quoted();
    let mut statements = Vec::with_capacity(columns.len() * 3);

    for column in columns {
        let prefix = format!("ALTER TABLE {} ALTER COLUMN {}", table, quote_ident(&column.name));
        statements.push(format!("{} TYPE {}", prefix, column.data_type.sql()));
        match column.nullable {
            Some(true) => statements.push(format!("{} DROP NOT NULL", prefix)),
            Some(false) => statements.push(format!("{} SET NOT NULL", prefix)),
            None => {}
        }
        match &column.default {
            Some(Some(default)) => statements.push(format!(
                "{} SET DEFAULT {}",
                prefix,
                render_default(default)
            )),
            Some(None) => statements.push(format!("{} DROP DEFAULT", prefix)),
            None => {}
        }
    }
    statements
}

pub fn rename_column(table: &QualifiedName, from: &str, to: &str) -> String {
    format!(
        "ALTER TABLE {} RENAME COLUMN {} TO {}",
        table.quoted(),
        quote_ident(from),
        quote_ident(to)
    )
}

pub fn drop_column(table: &QualifiedName, name: &str) -> String {
    format!("ALTER TABLE {} DROP COLUMN {}", table.quoted(), quote_ident(name))
}

/// Rename within the same schema
pub fn rename_table(table: &QualifiedName, new_name: &str) -> String {
    format!("ALTER TABLE {} RENAME TO {}", table.quoted(), quote_ident(new_name))
}

/// Copy structure (and optionally rows) into a new table
pub fn duplicate_table(source: &QualifiedName, target: &QualifiedName, with_data: bool) -> String {
    let mut sql = format!("CREATE TABLE {} AS TABLE {}", target.quoted(), source.quoted());
    if !with_data {
        sql.push_str(" WITH NO DATA");
    }
    sql
}

pub fn drop_table(table: &QualifiedName) -> String {
    format!("DROP TABLE {}", table.quoted())
}

pub fn create_index(spec: &IndexSpec) -> String {
    let columns: Vec<String> = spec.columns.iter().map(|c| quote_ident(c)).collect();
    format!(
        "CREATE {}INDEX {} ON {} USING {} ({})",
        if spec.unique { "UNIQUE " } else { "" },
        quote_ident(&spec.name),
        spec.table.quoted(),
        spec.method.as_str(),
        columns.join(", ")
    )
}

/// Indexes live in their table's schema
pub fn drop_index(schema: &str, name: &str) -> String {
    format!("DROP INDEX {}", QualifiedName::new(schema, name).quoted())
}

pub fn create_function(spec: &FunctionSpec) -> String {
    let params: Vec<String> = spec
        .params
        .iter()
        .map(|p| format!("{} {}", quote_ident(&p.name), p.data_type.sql()))
        .collect();

    format!(
        "CREATE FUNCTION {}({}) RETURNS {} LANGUAGE {} AS {tag}\n{}\n{tag}",
        spec.name.quoted(),
        params.join(", "),
        spec.returns.sql(),
        spec.language.as_str(),
        spec.body,
        tag = BODY_TAG
    )
}

/// `identity_args` must come from the catalog (`pg_get_function_identity_arguments`)
pub fn drop_function(name: &QualifiedName, identity_args: &str) -> String {
    format!("DROP FUNCTION {}({})", name.quoted(), identity_args)
}
