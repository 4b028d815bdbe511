//! Project repository for PostgreSQL operations

use sqlx::PgPool;
use uuid::Uuid;

use crate::data::postgres::PostgresError;
use crate::data::types::{ProjectRow, ProjectStatus};

type ProjectTuple = (Uuid, String, String, String, String, i64, i64);

const PROJECT_COLUMNS: &str =
    "id, organization_id, name, database_name, status, created_at, updated_at";

fn row_to_project(
    (id, organization_id, name, database_name, status, created_at, updated_at): ProjectTuple,
) -> Result<ProjectRow, PostgresError> {
    let status = ProjectStatus::parse(&status).ok_or_else(|| {
        PostgresError::CorruptRow(format!("project {} has unknown status '{}'", id, status))
    })?;
    Ok(ProjectRow {
        id,
        organization_id,
        name,
        database_name,
        status,
        created_at,
        updated_at,
    })
}

/// Insert a project in the `provisioning` state
///
/// A database name already claimed by another project is reported as
/// [`PostgresError::Conflict`].
pub async fn create_project(
    pool: &PgPool,
    id: Uuid,
    organization_id: &str,
    name: &str,
    database_name: &str,
) -> Result<ProjectRow, PostgresError> {
    let now = chrono::Utc::now().timestamp();

    let result = sqlx::query(
        "INSERT INTO projects (id, organization_id, name, database_name, status, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(id)
    .bind(organization_id)
    .bind(name)
    .bind(database_name)
    .bind(ProjectStatus::Provisioning.as_str())
    .bind(now)
    .bind(now)
    .execute(pool)
    .await;

    if let Err(e) = result {
        let err = PostgresError::from(e);
        if err.is_unique_violation() {
            return Err(PostgresError::Conflict(format!(
                "Project {} or database {} already exists",
                id, database_name
            )));
        }
        return Err(err);
    }

    Ok(ProjectRow {
        id,
        organization_id: organization_id.to_string(),
        name: name.to_string(),
        database_name: database_name.to_string(),
        status: ProjectStatus::Provisioning,
        created_at: now,
        updated_at: now,
    })
}

/// Get a project by ID
pub async fn get_project(pool: &PgPool, id: Uuid) -> Result<Option<ProjectRow>, PostgresError> {
    let row = sqlx::query_as::<_, ProjectTuple>(&format!(
        "SELECT {} FROM projects WHERE id = $1",
        PROJECT_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.map(row_to_project).transpose()
}

/// List projects, newest first, optionally restricted to one organization
pub async fn list_projects(
    pool: &PgPool,
    organization_id: Option<&str>,
) -> Result<Vec<ProjectRow>, PostgresError> {
    let rows = match organization_id {
        Some(org) => {
            sqlx::query_as::<_, ProjectTuple>(&format!(
                "SELECT {} FROM projects WHERE organization_id = $1 ORDER BY created_at DESC, id",
                PROJECT_COLUMNS
            ))
            .bind(org)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, ProjectTuple>(&format!(
                "SELECT {} FROM projects ORDER BY created_at DESC, id",
                PROJECT_COLUMNS
            ))
            .fetch_all(pool)
            .await?
        }
    };

    rows.into_iter().map(row_to_project).collect()
}

/// Update a project's lifecycle status. Returns false if the project doesn't exist.
pub async fn set_project_status(
    pool: &PgPool,
    id: Uuid,
    status: ProjectStatus,
) -> Result<bool, PostgresError> {
    let now = chrono::Utc::now().timestamp();

    let result = sqlx::query("UPDATE projects SET status = $1, updated_at = $2 WHERE id = $3")
        .bind(status.as_str())
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete a project row. Returns false if the project doesn't exist.
pub async fn delete_project(pool: &PgPool, id: Uuid) -> Result<bool, PostgresError> {
    let result = sqlx::query("DELETE FROM projects WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
