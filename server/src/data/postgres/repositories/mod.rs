//! PostgreSQL repositories
//!
//! Types (ProjectRow, ProjectStatus) should be imported from `crate::data::types`.

pub mod project;

pub use project::{
    create_project, delete_project, get_project, list_projects, set_project_status,
};
