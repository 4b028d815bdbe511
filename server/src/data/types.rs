//! Control-plane row types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of a project's physical database
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    /// Row inserted, database not yet created
    Provisioning,
    /// Database exists and accepts schema operations
    Active,
    /// Teardown started; the database no longer accepts schema operations
    Deprovisioning,
    /// Provisioning or teardown failed part-way
    Failed,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Provisioning => "provisioning",
            Self::Active => "active",
            Self::Deprovisioning => "deprovisioning",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "provisioning" => Some(Self::Provisioning),
            "active" => Some(Self::Active),
            "deprovisioning" => Some(Self::Deprovisioning),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Project row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRow {
    pub id: Uuid,
    pub organization_id: String,
    pub name: String,
    pub database_name: String,
    pub status: ProjectStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_status_round_trip() {
        for status in [
            ProjectStatus::Provisioning,
            ProjectStatus::Active,
            ProjectStatus::Deprovisioning,
            ProjectStatus::Failed,
        ] {
            assert_eq!(ProjectStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(ProjectStatus::parse("Active"), None);
    }

    #[test]
    fn test_project_status_serde() {
        assert_eq!(
            serde_json::to_string(&ProjectStatus::Provisioning).unwrap(),
            r#""provisioning""#
        );
    }
}
