//! ProjectRepository trait implementation for PostgreSQL

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::data::error::DataError;
use crate::data::traits::ProjectRepository;
use crate::data::types::{ProjectRow, ProjectStatus};

use super::PostgresService;
use super::repositories::project;

#[async_trait]
impl ProjectRepository for Arc<PostgresService> {
    async fn create_project(
        &self,
        id: Uuid,
        organization_id: &str,
        name: &str,
        database_name: &str,
    ) -> Result<ProjectRow, DataError> {
        project::create_project(self.pool(), id, organization_id, name, database_name)
            .await
            .map_err(Into::into)
    }

    async fn get_project(&self, id: Uuid) -> Result<Option<ProjectRow>, DataError> {
        project::get_project(self.pool(), id)
            .await
            .map_err(Into::into)
    }

    async fn list_projects(
        &self,
        organization_id: Option<&str>,
    ) -> Result<Vec<ProjectRow>, DataError> {
        project::list_projects(self.pool(), organization_id)
            .await
            .map_err(Into::into)
    }

    async fn set_project_status(
        &self,
        id: Uuid,
        status: ProjectStatus,
    ) -> Result<bool, DataError> {
        project::set_project_status(self.pool(), id, status)
            .await
            .map_err(Into::into)
    }

    async fn delete_project(&self, id: Uuid) -> Result<bool, DataError> {
        project::delete_project(self.pool(), id)
            .await
            .map_err(Into::into)
    }
}
