//! Schema engine errors
//!
//! Every error carries a machine-stable key (`table.error.alreadyExists`,
//! `database.error.timeout`, ...) that callers map to a status and a
//! localized message.

use thiserror::Error;
use uuid::Uuid;

use super::validate::{Subject, ValidationErrors};
use crate::data::{DataError, ProjectStatus};

/// SQLSTATEs PostgreSQL raises when a created object already exists
const DUPLICATE_OBJECT_STATES: &[&str] = &[
    "42P07", // duplicate_table
    "42701", // duplicate_column
    "42710", // duplicate_object
    "42723", // duplicate_function
    "42P06", // duplicate_schema
];

/// Coarse error family, one per row of the error taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Conflict,
    NotFound,
    Execution,
    Routing,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Conflict => "conflict",
            Self::NotFound => "not_found",
            Self::Execution => "execution",
            Self::Routing => "routing",
        }
    }
}

/// Failure to map a project to its tenant database
#[derive(Error, Debug)]
pub enum RoutingError {
    #[error("Project {0} does not exist")]
    ProjectNotFound(Uuid),

    #[error("Project {project_id} is not provisioned (status: {status})")]
    NotProvisioned {
        project_id: Uuid,
        status: ProjectStatus,
    },

    #[error("Project {0} points at the control-plane database")]
    ControlPlaneDatabase(Uuid),

    #[error("Invalid database name: {0}")]
    InvalidDatabaseName(String),

    #[error("Project lookup failed: {0}")]
    Directory(#[from] DataError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl RoutingError {
    pub fn key(&self) -> &'static str {
        match self {
            Self::ProjectNotFound(_) => "project.error.notFound",
            Self::NotProvisioned { .. } => "project.error.notProvisioned",
            Self::ControlPlaneDatabase(_) => "project.error.controlPlane",
            Self::InvalidDatabaseName(_) => "database.error.invalidName",
            Self::Directory(_) | Self::Database(_) => "database.error.execution",
        }
    }
}

#[derive(Error, Debug)]
pub enum SchemaError {
    /// Rejected before any database contact
    #[error("{0}")]
    Validation(#[from] ValidationErrors),

    #[error("{message}")]
    Conflict { key: String, message: String },

    #[error("{message}")]
    NotFound { key: String, message: String },

    /// The database rejected a pre-validated statement or was unreachable
    #[error("{operation} on {target} failed: {source}")]
    Execution {
        operation: &'static str,
        target: String,
        #[source]
        source: sqlx::Error,
    },

    /// Deadline passed and the post-condition did not hold afterwards
    #[error("{operation} on {target} did not complete within {timeout_secs}s")]
    Timeout {
        operation: &'static str,
        target: String,
        timeout_secs: u64,
    },

    #[error(transparent)]
    Routing(#[from] RoutingError),
}

impl SchemaError {
    pub fn conflict(subject: Subject, code: &str, message: impl Into<String>) -> Self {
        Self::Conflict {
            key: format!("{}.error.{}", subject, code),
            message: message.into(),
        }
    }

    pub fn not_found(subject: Subject, message: impl Into<String>) -> Self {
        Self::NotFound {
            key: format!("{}.error.notFound", subject),
            message: message.into(),
        }
    }

    pub fn execution(operation: &'static str, target: impl Into<String>, source: sqlx::Error) -> Self {
        Self::Execution {
            operation,
            target: target.into(),
            source,
        }
    }

    /// Machine-stable error key
    pub fn key(&self) -> String {
        match self {
            Self::Validation(errors) => errors.key(),
            Self::Conflict { key, .. } | Self::NotFound { key, .. } => key.clone(),
            Self::Execution { .. } => "database.error.execution".to_string(),
            Self::Timeout { .. } => "database.error.timeout".to_string(),
            Self::Routing(e) => e.key().to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Execution { .. } | Self::Timeout { .. } => ErrorKind::Execution,
            Self::Routing(_) => ErrorKind::Routing,
        }
    }

    /// Re-label a database "already exists" failure as a conflict
    ///
    /// Two concurrent creates can both pass the catalog check; the loser gets
    /// PostgreSQL's duplicate error, reported here under the same key the
    /// catalog check would have produced.
    pub fn or_conflict(self, subject: Subject) -> Self {
        match self {
            Self::Execution {
                operation,
                target,
                source,
            } => {
                let duplicate = match &source {
                    sqlx::Error::Database(e) => e
                        .code()
                        .is_some_and(|code| DUPLICATE_OBJECT_STATES.contains(&&*code)),
                    _ => false,
                };
                if duplicate {
                    Self::conflict(
                        subject,
                        "alreadyExists",
                        format!("{} '{}' already exists ({})", subject, target, source),
                    )
                } else {
                    Self::Execution {
                        operation,
                        target,
                        source,
                    }
                }
            }
            other => other,
        }
    }
}
