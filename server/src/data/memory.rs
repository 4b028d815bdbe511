//! In-memory project repository for unit tests

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use uuid::Uuid;

use super::error::DataError;
use super::traits::ProjectRepository;
use super::types::{ProjectRow, ProjectStatus};

/// Project rows held in a map; counts every call so tests can assert that
/// no control-plane lookups happened
#[derive(Default)]
pub struct MemoryProjects {
    rows: Mutex<HashMap<Uuid, ProjectRow>>,
    transitions: Mutex<Vec<ProjectStatus>>,
    calls: AtomicUsize,
}

impl MemoryProjects {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a row directly, bypassing the call counter
    pub fn insert(&self, id: Uuid, database_name: &str, status: ProjectStatus) -> ProjectRow {
        let row = ProjectRow {
            id,
            organization_id: "org_test".to_string(),
            name: "test".to_string(),
            database_name: database_name.to_string(),
            status,
            created_at: 0,
            updated_at: 0,
        };
        self.rows.lock().unwrap().insert(id, row.clone());
        row
    }

    /// Number of repository calls made so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn row_count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    /// Every status written through `set_project_status`, in order
    pub fn transitions(&self) -> Vec<ProjectStatus> {
        self.transitions.lock().unwrap().clone()
    }

    fn touch(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ProjectRepository for MemoryProjects {
    async fn create_project(
        &self,
        id: Uuid,
        organization_id: &str,
        name: &str,
        database_name: &str,
    ) -> Result<ProjectRow, DataError> {
        self.touch();
        let mut rows = self.rows.lock().unwrap();
        if rows.contains_key(&id) || rows.values().any(|r| r.database_name == database_name) {
            return Err(DataError::Conflict(database_name.to_string()));
        }
        let row = ProjectRow {
            id,
            organization_id: organization_id.to_string(),
            name: name.to_string(),
            database_name: database_name.to_string(),
            status: ProjectStatus::Provisioning,
            created_at: 0,
            updated_at: 0,
        };
        rows.insert(id, row.clone());
        Ok(row)
    }

    async fn get_project(&self, id: Uuid) -> Result<Option<ProjectRow>, DataError> {
        self.touch();
        Ok(self.rows.lock().unwrap().get(&id).cloned())
    }

    async fn list_projects(
        &self,
        organization_id: Option<&str>,
    ) -> Result<Vec<ProjectRow>, DataError> {
        self.touch();
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|r| organization_id.is_none_or(|org| r.organization_id == org))
            .cloned()
            .collect())
    }

    async fn set_project_status(
        &self,
        id: Uuid,
        status: ProjectStatus,
    ) -> Result<bool, DataError> {
        self.touch();
        self.transitions.lock().unwrap().push(status);
        match self.rows.lock().unwrap().get_mut(&id) {
            Some(row) => {
                row.status = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_project(&self, id: Uuid) -> Result<bool, DataError> {
        self.touch();
        Ok(self.rows.lock().unwrap().remove(&id).is_some())
    }
}
