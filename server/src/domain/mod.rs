//! Domain logic
//!
//! - `projects` - project provisioning in lockstep with the physical database

pub mod projects;

pub use projects::{CreateProjectRequest, ProjectError, ProjectService};
