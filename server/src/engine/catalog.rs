//! Catalog introspection
//!
//! Read-only queries against a tenant database's `pg_catalog`. Nothing is
//! cached: every call round-trips so the catalog stays the single source of
//! truth for what a table, index or function looks like right now.

use std::collections::HashSet;

use sqlx::PgPool;

use super::types::{
    ColumnDefinition, FunctionDefinition, FunctionParamDefinition, FunctionSummary,
    IndexDefinition, QualifiedName, TableSummary, catalog_type_label,
};

/// Case-sensitive de-duplication, preserving first occurrence
fn distinct_names(names: &[&str]) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .iter()
        .filter(|n| seen.insert(**n))
        .map(|n| n.to_string())
        .collect()
}

// ============================================================================
// Schemas and tables
// ============================================================================

pub async fn schema_exists(pool: &PgPool, schema: &str) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM pg_namespace WHERE nspname = $1)")
        .bind(schema)
        .fetch_one(pool)
        .await
}

/// Ordinary or partitioned table with this name
pub async fn table_exists(pool: &PgPool, table: &QualifiedName) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM pg_class c
            JOIN pg_namespace n ON n.oid = c.relnamespace
            WHERE n.nspname = $1 AND c.relname = $2 AND c.relkind IN ('r', 'p')
        )
        "#,
    )
    .bind(&table.schema)
    .bind(&table.name)
    .fetch_one(pool)
    .await
}

/// Any relation (table, view, index, sequence) occupying this name
pub async fn relation_exists(pool: &PgPool, name: &QualifiedName) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM pg_class c
            JOIN pg_namespace n ON n.oid = c.relnamespace
            WHERE n.nspname = $1 AND c.relname = $2
        )
        "#,
    )
    .bind(&name.schema)
    .bind(&name.name)
    .fetch_one(pool)
    .await
}

pub async fn list_tables(pool: &PgPool, schema: &str) -> Result<Vec<TableSummary>, sqlx::Error> {
    let rows = sqlx::query_as::<_, (String, i64)>(
        r#"
        SELECT c.relname::text, count(a.attnum)
        FROM pg_class c
        JOIN pg_namespace n ON n.oid = c.relnamespace
        LEFT JOIN pg_attribute a
            ON a.attrelid = c.oid AND a.attnum > 0 AND NOT a.attisdropped
        WHERE n.nspname = $1 AND c.relkind IN ('r', 'p')
        GROUP BY c.relname
        ORDER BY c.relname
        "#,
    )
    .bind(schema)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(name, column_count)| TableSummary {
            schema: schema.to_string(),
            name,
            column_count,
        })
        .collect())
}

// ============================================================================
// Columns
// ============================================================================

type ColumnRow = (
    String,
    bool,
    String,
    Option<String>,
    bool,
    bool,
    Option<String>,
    Option<String>,
);

/// Live columns in attribute order, with constraint flags
///
/// An empty result means the table does not exist or has no columns.
pub async fn list_columns(
    pool: &PgPool,
    table: &QualifiedName,
) -> Result<Vec<ColumnDefinition>, sqlx::Error> {
    let rows = sqlx::query_as::<_, ColumnRow>(
        r#"
        SELECT
            a.attname::text,
            a.attnotnull,
            format_type(a.atttypid, a.atttypmod),
            pg_get_expr(d.adbin, d.adrelid),
            EXISTS (
                SELECT 1 FROM pg_constraint k
                WHERE k.conrelid = a.attrelid AND k.contype = 'p' AND a.attnum = ANY (k.conkey)
            ),
            EXISTS (
                SELECT 1 FROM pg_constraint k
                WHERE k.conrelid = a.attrelid AND k.contype = 'u' AND a.attnum = ANY (k.conkey)
            ),
            fk.ref_table,
            fk.ref_column
        FROM pg_attribute a
        JOIN pg_class c ON c.oid = a.attrelid
        JOIN pg_namespace n ON n.oid = c.relnamespace
        LEFT JOIN pg_attrdef d ON d.adrelid = a.attrelid AND d.adnum = a.attnum
        LEFT JOIN LATERAL (
            SELECT
                rn.nspname::text || '.' || rc.relname::text AS ref_table,
                ra.attname::text AS ref_column
            FROM pg_constraint k
            JOIN pg_class rc ON rc.oid = k.confrelid
            JOIN pg_namespace rn ON rn.oid = rc.relnamespace
            JOIN pg_attribute ra
                ON ra.attrelid = k.confrelid
                AND ra.attnum = k.confkey[array_position(k.conkey, a.attnum)]
            WHERE k.conrelid = a.attrelid AND k.contype = 'f' AND a.attnum = ANY (k.conkey)
            LIMIT 1
        ) fk ON true
        WHERE n.nspname = $1 AND c.relname = $2 AND a.attnum > 0 AND NOT a.attisdropped
        ORDER BY a.attnum
        "#,
    )
    .bind(&table.schema)
    .bind(&table.name)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .enumerate()
        .map(
            |(i, (name, not_null, formatted, default, primary, unique, ref_table, ref_column))| {
                ColumnDefinition {
                    name,
                    position: i as u32 + 1,
                    nullable: !not_null,
                    data_type: catalog_type_label(&formatted, default.as_deref()),
                    default,
                    primary,
                    unique,
                    foreign: ref_table.is_some(),
                    reference_table: ref_table,
                    reference_column: ref_column,
                }
            },
        )
        .collect())
}

/// Number of distinct names from `names` that exist as live columns
async fn count_existing_columns(
    pool: &PgPool,
    table: &QualifiedName,
    names: &[String],
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        SELECT count(DISTINCT a.attname)
        FROM pg_attribute a
        JOIN pg_class c ON c.oid = a.attrelid
        JOIN pg_namespace n ON n.oid = c.relnamespace
        WHERE n.nspname = $1 AND c.relname = $2
            AND a.attnum > 0 AND NOT a.attisdropped
            AND a.attname::text = ANY ($3)
        "#,
    )
    .bind(&table.schema)
    .bind(&table.name)
    .bind(names)
    .fetch_one(pool)
    .await
}

pub async fn column_exists(
    pool: &PgPool,
    table: &QualifiedName,
    name: &str,
) -> Result<bool, sqlx::Error> {
    any_column_exists(pool, table, &[name]).await
}

/// True when at least one of `names` is already a column (single round-trip)
pub async fn any_column_exists(
    pool: &PgPool,
    table: &QualifiedName,
    names: &[&str],
) -> Result<bool, sqlx::Error> {
    let names = distinct_names(names);
    Ok(count_existing_columns(pool, table, &names).await? > 0)
}

/// True when every one of `names` is a column (single round-trip)
pub async fn all_columns_exist(
    pool: &PgPool,
    table: &QualifiedName,
    names: &[&str],
) -> Result<bool, sqlx::Error> {
    let names = distinct_names(names);
    Ok(count_existing_columns(pool, table, &names).await? == names.len() as i64)
}

// ============================================================================
// Indexes
// ============================================================================

pub async fn list_indexes(pool: &PgPool, table: &QualifiedName) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        SELECT indexname::text FROM pg_indexes
        WHERE schemaname = $1 AND tablename = $2
        ORDER BY indexname
        "#,
    )
    .bind(&table.schema)
    .bind(&table.name)
    .fetch_all(pool)
    .await
}

pub async fn index_exists(
    pool: &PgPool,
    table: &QualifiedName,
    name: &str,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM pg_indexes
            WHERE schemaname = $1 AND tablename = $2 AND indexname = $3
        )
        "#,
    )
    .bind(&table.schema)
    .bind(&table.name)
    .bind(name)
    .fetch_one(pool)
    .await
}

/// PostgreSQL's own `CREATE INDEX` rendering, for display
pub async fn get_index_definition(
    pool: &PgPool,
    table: &QualifiedName,
    name: &str,
) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        SELECT indexdef FROM pg_indexes
        WHERE schemaname = $1 AND tablename = $2 AND indexname = $3
        "#,
    )
    .bind(&table.schema)
    .bind(&table.name)
    .bind(name)
    .fetch_optional(pool)
    .await
}

/// Structured view of one index; expression keys are omitted from `columns`
pub async fn describe_index(
    pool: &PgPool,
    table: &QualifiedName,
    name: &str,
) -> Result<Option<IndexDefinition>, sqlx::Error> {
    let row = sqlx::query_as::<_, (String, bool, String, Vec<String>)>(
        r#"
        SELECT
            ic.relname::text,
            ix.indisunique,
            am.amname::text,
            ARRAY(
                SELECT a.attname::text
                FROM unnest(ix.indkey::int2[]) WITH ORDINALITY AS k(attnum, ord)
                JOIN pg_attribute a ON a.attrelid = ix.indrelid AND a.attnum = k.attnum
                ORDER BY k.ord
            )
        FROM pg_index ix
        JOIN pg_class ic ON ic.oid = ix.indexrelid
        JOIN pg_class tc ON tc.oid = ix.indrelid
        JOIN pg_namespace n ON n.oid = tc.relnamespace
        JOIN pg_am am ON am.oid = ic.relam
        WHERE n.nspname = $1 AND tc.relname = $2 AND ic.relname = $3
        "#,
    )
    .bind(&table.schema)
    .bind(&table.name)
    .bind(name)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|(name, unique, method, columns)| IndexDefinition {
        name,
        table: table.clone(),
        columns,
        unique,
        method,
    }))
}

// ============================================================================
// Functions
// ============================================================================

pub async fn list_functions(
    pool: &PgPool,
    schema: &str,
) -> Result<Vec<FunctionSummary>, sqlx::Error> {
    let rows = sqlx::query_as::<_, (String, String, Option<String>, String)>(
        r#"
        SELECT
            p.proname::text,
            pg_get_function_identity_arguments(p.oid),
            pg_get_function_result(p.oid),
            l.lanname::text
        FROM pg_proc p
        JOIN pg_namespace n ON n.oid = p.pronamespace
        JOIN pg_language l ON l.oid = p.prolang
        WHERE n.nspname = $1 AND p.prokind = 'f'
        ORDER BY p.proname, 2
        "#,
    )
    .bind(schema)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(name, arguments, returns, language)| FunctionSummary {
            schema: schema.to_string(),
            name,
            arguments,
            returns: catalog_type_label(returns.as_deref().unwrap_or_default(), None),
            language,
        })
        .collect())
}

pub async fn function_exists(
    pool: &PgPool,
    name: &QualifiedName,
) -> Result<bool, sqlx::Error> {
    Ok(!function_signatures(pool, name).await?.is_empty())
}

/// Identity argument lists of every overload with this name
pub async fn function_signatures(
    pool: &PgPool,
    name: &QualifiedName,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        SELECT pg_get_function_identity_arguments(p.oid)
        FROM pg_proc p
        JOIN pg_namespace n ON n.oid = p.pronamespace
        WHERE n.nspname = $1 AND p.proname = $2 AND p.prokind = 'f'
        ORDER BY p.oid
        "#,
    )
    .bind(&name.schema)
    .bind(&name.name)
    .fetch_all(pool)
    .await
}

type FunctionRow = (
    String,
    Option<String>,
    String,
    String,
    Vec<String>,
    Vec<String>,
    String,
);

/// Oldest overload with this name, reconstructed from the catalog
pub async fn get_function(
    pool: &PgPool,
    name: &QualifiedName,
) -> Result<Option<FunctionDefinition>, sqlx::Error> {
    let row = sqlx::query_as::<_, FunctionRow>(
        r#"
        SELECT
            p.proname::text,
            pg_get_function_result(p.oid),
            l.lanname::text,
            p.prosrc,
            COALESCE(p.proargnames, '{}'::text[]),
            ARRAY(
                SELECT format_type(t.type_oid, NULL)
                FROM unnest(p.proargtypes::oid[]) WITH ORDINALITY AS t(type_oid, ord)
                ORDER BY t.ord
            ),
            pg_get_functiondef(p.oid)
        FROM pg_proc p
        JOIN pg_namespace n ON n.oid = p.pronamespace
        JOIN pg_language l ON l.oid = p.prolang
        WHERE n.nspname = $1 AND p.proname = $2 AND p.prokind = 'f'
        ORDER BY p.oid
        LIMIT 1
        "#,
    )
    .bind(&name.schema)
    .bind(&name.name)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(
        |(proname, returns, language, body, arg_names, arg_types, definition)| {
            let params = arg_types
                .iter()
                .enumerate()
                .map(|(i, data_type)| FunctionParamDefinition {
                    name: arg_names.get(i).cloned().unwrap_or_default(),
                    data_type: catalog_type_label(data_type, None),
                })
                .collect();
            FunctionDefinition {
                schema: name.schema.clone(),
                name: proname,
                params,
                returns: catalog_type_label(returns.as_deref().unwrap_or_default(), None),
                language,
                body: body.trim_matches('\n').to_string(),
                definition,
            }
        },
    ))
}

#[cfg(test)]
mod tests {
    // Catalog queries run against a live PostgreSQL instance in tests/engine.rs
    use super::*;

    #[test]
    fn test_distinct_names_preserves_order() {
        assert_eq!(
            distinct_names(&["b", "a", "b", "c", "a"]),
            vec!["b".to_string(), "a".to_string(), "c".to_string()]
        );
    }

    #[test]
    fn test_distinct_names_is_case_sensitive() {
        assert_eq!(distinct_names(&["Email", "email"]).len(), 2);
    }
}
