//! Project provisioning
//!
//! A project row and its physical database are created and dropped together.
//! The row goes in first as `provisioning`; the database is created from the
//! control plane; the row is then marked `active`. If the database cannot be
//! created the row is removed again, so no project ever points at nothing.

use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;
use validator::Validate;

use crate::data::{DataError, ProjectRepository, ProjectRow, ProjectStatus};
use crate::engine::{RoutingError, TenantRouter};

/// Input for provisioning a project
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateProjectRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    #[validate(length(
        min = 1,
        max = 100,
        message = "Organization ID must be 1-100 characters"
    ))]
    pub organization_id: String,
}

#[derive(Error, Debug)]
pub enum ProjectError {
    #[error("Invalid project request: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Project {0} does not exist")]
    NotFound(Uuid),

    #[error("Project already exists: {0}")]
    Conflict(String),

    #[error(transparent)]
    Routing(#[from] RoutingError),

    #[error("Project store error: {0}")]
    Data(#[source] DataError),
}

impl From<DataError> for ProjectError {
    fn from(err: DataError) -> Self {
        match err {
            DataError::Conflict(what) => Self::Conflict(what),
            other => Self::Data(other),
        }
    }
}

impl ProjectError {
    /// Machine-stable error key
    pub fn key(&self) -> &'static str {
        match self {
            Self::Validation(_) => "project.error.invalidRequest",
            Self::NotFound(_) => "project.error.notFound",
            Self::Conflict(_) => "project.error.alreadyExists",
            Self::Routing(e) => e.key(),
            Self::Data(_) => "database.error.execution",
        }
    }
}

pub struct ProjectService {
    repository: Arc<dyn ProjectRepository>,
    router: Arc<TenantRouter>,
    database_prefix: String,
}

impl ProjectService {
    pub fn new(
        repository: Arc<dyn ProjectRepository>,
        router: Arc<TenantRouter>,
        database_prefix: impl Into<String>,
    ) -> Self {
        Self {
            repository,
            router,
            database_prefix: database_prefix.into(),
        }
    }

    /// Physical database name for a project id
    pub fn database_name(&self, id: Uuid) -> String {
        format!("{}_{}", self.database_prefix, id.simple())
    }

    /// Create a project and its database
    pub async fn provision(&self, req: &CreateProjectRequest) -> Result<ProjectRow, ProjectError> {
        req.validate()?;

        let id = Uuid::new_v4();
        let database_name = self.database_name(id);
        let row = self
            .repository
            .create_project(id, &req.organization_id, &req.name, &database_name)
            .await?;

        if let Err(e) = self.router.create_database(&database_name).await {
            tracing::warn!(
                project_id = %id,
                database = %database_name,
                error = %e,
                "Database creation failed, removing project row"
            );
            if let Err(cleanup) = self.repository.delete_project(id).await {
                tracing::error!(project_id = %id, error = %cleanup, "Failed to remove project row");
            }
            return Err(e.into());
        }

        self.repository
            .set_project_status(id, ProjectStatus::Active)
            .await?;

        tracing::info!(
            project_id = %id,
            organization_id = %req.organization_id,
            database = %database_name,
            "Project provisioned"
        );
        Ok(ProjectRow {
            status: ProjectStatus::Active,
            ..row
        })
    }

    /// Drop a project's database, then its row
    ///
    /// The row leaves `active` before the cached pool is evicted, so a
    /// concurrent resolve cannot register a new pool for the database being
    /// dropped. If the drop fails the row stays, marked `failed`, so the
    /// operator can retry.
    pub async fn deprovision(&self, id: Uuid) -> Result<(), ProjectError> {
        let row = self.get(id).await?;

        self.repository
            .set_project_status(id, ProjectStatus::Deprovisioning)
            .await?;
        self.router.evict(id).await;

        if let Err(e) = self.router.drop_database_if_exists(&row.database_name).await {
            tracing::warn!(
                project_id = %id,
                database = %row.database_name,
                error = %e,
                "Database drop failed, marking project failed"
            );
            if let Err(mark) = self
                .repository
                .set_project_status(id, ProjectStatus::Failed)
                .await
            {
                tracing::error!(project_id = %id, error = %mark, "Failed to mark project failed");
            }
            self.router.evict(id).await;
            return Err(e.into());
        }

        // A resolve that read the row before the status change may have
        // registered a pool since the first evict
        self.router.evict(id).await;
        self.repository.delete_project(id).await?;
        tracing::info!(project_id = %id, database = %row.database_name, "Project deprovisioned");
        Ok(())
    }

    pub async fn get(&self, id: Uuid) -> Result<ProjectRow, ProjectError> {
        self.repository
            .get_project(id)
            .await?
            .ok_or(ProjectError::NotFound(id))
    }

    pub async fn list(&self, organization_id: Option<&str>) -> Result<Vec<ProjectRow>, ProjectError> {
        Ok(self.repository.list_projects(organization_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::memory::MemoryProjects;
    use crate::engine::router::tests::offline_router;

    fn service(projects: Arc<MemoryProjects>) -> ProjectService {
        let router = Arc::new(offline_router(projects.clone()));
        ProjectService::new(projects, router, "tenant")
    }

    fn request(org: &str, name: &str) -> CreateProjectRequest {
        CreateProjectRequest {
            name: name.to_string(),
            organization_id: org.to_string(),
        }
    }

    #[tokio::test]
    async fn test_database_name_is_valid() {
        let projects = Arc::new(MemoryProjects::new());
        let service = service(projects);
        let id = Uuid::new_v4();

        let name = service.database_name(id);
        assert!(name.starts_with("tenant_"));
        assert_eq!(name.len(), "tenant_".len() + 32);
        assert!(crate::engine::router::validate_database_name(&name).is_ok());
    }

    #[tokio::test]
    async fn test_provision_rejects_invalid_request() {
        let projects = Arc::new(MemoryProjects::new());
        let service = service(projects.clone());

        let err = service.provision(&request("", "shop")).await.unwrap_err();
        assert_eq!(err.key(), "project.error.invalidRequest");

        let err = service
            .provision(&request("org_1", &"x".repeat(101)))
            .await
            .unwrap_err();
        assert_eq!(err.key(), "project.error.invalidRequest");
        assert_eq!(projects.calls(), 0);
    }

    #[tokio::test]
    async fn test_failed_database_creation_leaves_no_row() {
        let projects = Arc::new(MemoryProjects::new());
        let service = service(projects.clone());

        let err = service.provision(&request("org_1", "shop")).await.unwrap_err();
        assert_eq!(err.key(), "database.error.execution");
        assert_eq!(projects.row_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_drop_marks_project_failed() {
        let projects = Arc::new(MemoryProjects::new());
        let id = Uuid::new_v4();
        projects.insert(id, "tenant_a", ProjectStatus::Active);
        let service = service(projects.clone());

        assert!(service.deprovision(id).await.is_err());
        let row = service.get(id).await.unwrap();
        assert_eq!(row.status, ProjectStatus::Failed);
    }

    #[tokio::test]
    async fn test_deprovision_stops_routing_before_evicting() {
        let projects = Arc::new(MemoryProjects::new());
        let id = Uuid::new_v4();
        projects.insert(id, "tenant_a", ProjectStatus::Active);
        let router = Arc::new(offline_router(projects.clone()));
        let service = ProjectService::new(projects.clone(), router.clone(), "tenant");

        router.resolve(id).await.unwrap();
        assert_eq!(router.pool_count(), 1);

        assert!(service.deprovision(id).await.is_err());
        assert_eq!(
            projects.transitions(),
            vec![ProjectStatus::Deprovisioning, ProjectStatus::Failed]
        );
        assert_eq!(router.pool_count(), 0);

        let err = router.resolve(id).await.unwrap_err();
        assert_eq!(err.key(), "project.error.notProvisioned");
        assert_eq!(router.pool_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_project() {
        let projects = Arc::new(MemoryProjects::new());
        let service = service(projects);

        let err = service.deprovision(Uuid::new_v4()).await.unwrap_err();
        assert_eq!(err.key(), "project.error.notFound");
    }

    #[tokio::test]
    async fn test_list_filters_by_organization() {
        let projects = Arc::new(MemoryProjects::new());
        projects.insert(Uuid::new_v4(), "tenant_a", ProjectStatus::Active);
        let service = service(projects);

        assert_eq!(service.list(None).await.unwrap().len(), 1);
        assert_eq!(service.list(Some("org_test")).await.unwrap().len(), 1);
        assert!(service.list(Some("org_other")).await.unwrap().is_empty());
    }
}
