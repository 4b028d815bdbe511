//! Control-plane schema definitions
//!
//! The control plane only records which projects exist and where their
//! physical databases live. Tenant schemas are never described here; they are
//! read from each tenant database's own catalog.

/// Current schema version
pub const SCHEMA_VERSION: i32 = 3;

/// Complete schema SQL for a fresh control-plane database
pub const SCHEMA: &str = r#"
-- =============================================================================
-- Infrastructure: Schema version tracking
-- =============================================================================
CREATE TABLE IF NOT EXISTS schema_version (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    version INTEGER NOT NULL,
    applied_at BIGINT NOT NULL,
    description TEXT
);

CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at BIGINT NOT NULL,
    checksum TEXT NOT NULL,
    execution_time_ms INTEGER,
    success BOOLEAN NOT NULL DEFAULT TRUE
);

-- =============================================================================
-- Projects (one physical database each)
-- =============================================================================
CREATE TABLE IF NOT EXISTS projects (
    id UUID PRIMARY KEY,
    organization_id TEXT NOT NULL CHECK(length(organization_id) >= 1),
    name TEXT NOT NULL CHECK(length(name) >= 1 AND length(name) <= 100),
    database_name TEXT NOT NULL UNIQUE CHECK(database_name ~ '^[a-z][a-z0-9_]{0,62}$'),
    status TEXT NOT NULL DEFAULT 'provisioning'
        CONSTRAINT projects_status_check
        CHECK(status IN ('provisioning', 'active', 'deprovisioning', 'failed')),
    created_at BIGINT NOT NULL,
    updated_at BIGINT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_projects_org ON projects(organization_id);
CREATE INDEX IF NOT EXISTS idx_projects_status ON projects(status);
"#;

/// Versioned migrations applied to databases created by an older release
///
/// Each entry is `(version, name, sql)`; versions must be contiguous and end
/// at [`SCHEMA_VERSION`].
pub const MIGRATIONS: &[(i32, &str, &str)] = &[
    (
        2,
        "add_projects_status_index",
        "CREATE INDEX IF NOT EXISTS idx_projects_status ON projects(status)",
    ),
    (
        3,
        "add_deprovisioning_status",
        r#"
ALTER TABLE projects DROP CONSTRAINT IF EXISTS projects_status_check;
ALTER TABLE projects ADD CONSTRAINT projects_status_check
    CHECK(status IN ('provisioning', 'active', 'deprovisioning', 'failed'));
"#,
    ),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_contiguous_up_to_schema_version() {
        let versions: Vec<i32> = MIGRATIONS.iter().map(|(v, _, _)| *v).collect();
        let expected: Vec<i32> = (2..=SCHEMA_VERSION).collect();
        assert_eq!(versions, expected);
    }

    #[test]
    fn test_schema_defines_projects_table() {
        assert!(SCHEMA.contains("CREATE TABLE IF NOT EXISTS projects"));
        assert!(SCHEMA.contains("database_name TEXT NOT NULL UNIQUE"));
    }

    #[test]
    fn test_every_status_is_allowed_by_the_check() {
        use crate::data::ProjectStatus;

        let (_, _, latest) = MIGRATIONS[MIGRATIONS.len() - 1];
        for status in [
            ProjectStatus::Provisioning,
            ProjectStatus::Active,
            ProjectStatus::Deprovisioning,
            ProjectStatus::Failed,
        ] {
            let quoted = format!("'{}'", status.as_str());
            assert!(SCHEMA.contains(&quoted), "{status}");
            assert!(latest.contains(&quoted), "{status}");
        }
    }
}
