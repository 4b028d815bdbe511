//! Repository traits for the control plane
//!
//! The tenant router and project provisioning only see the control plane
//! through [`ProjectRepository`], so both can be exercised against an
//! in-memory implementation.

use async_trait::async_trait;
use uuid::Uuid;

use crate::data::error::DataError;
use crate::data::types::{ProjectRow, ProjectStatus};

/// Repository trait for project records
///
/// Implemented by the PostgreSQL control-plane backend.
#[async_trait]
pub trait ProjectRepository: Send + Sync {
    /// Insert a project in the `provisioning` state
    async fn create_project(
        &self,
        id: Uuid,
        organization_id: &str,
        name: &str,
        database_name: &str,
    ) -> Result<ProjectRow, DataError>;

    /// Get a project by ID
    async fn get_project(&self, id: Uuid) -> Result<Option<ProjectRow>, DataError>;

    /// List projects, optionally for one organization
    async fn list_projects(&self, organization_id: Option<&str>)
    -> Result<Vec<ProjectRow>, DataError>;

    /// Update lifecycle status; false if the project doesn't exist
    async fn set_project_status(&self, id: Uuid, status: ProjectStatus)
    -> Result<bool, DataError>;

    /// Delete a project row; false if the project doesn't exist
    async fn delete_project(&self, id: Uuid) -> Result<bool, DataError>;
}
