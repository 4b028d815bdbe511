//! Unified error type for data layer

use thiserror::Error;

use crate::data::postgres::PostgresError;

/// Unified error type for control-plane data operations
#[derive(Error, Debug)]
pub enum DataError {
    /// PostgreSQL database error
    #[error("PostgreSQL error: {0}")]
    Postgres(sqlx::Error),

    /// Migration failed
    #[error("Migration {version} ({name}) failed: {error}")]
    MigrationFailed {
        version: i32,
        name: String,
        error: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Conflict error (e.g., duplicate entry)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A stored row could not be decoded
    #[error("Corrupt row: {0}")]
    CorruptRow(String),
}

impl DataError {
    /// Check if this is a connection-related error that might be transient
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Postgres(e) => matches!(
                e,
                sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)
            ),
            _ => false,
        }
    }
}

impl From<PostgresError> for DataError {
    fn from(e: PostgresError) -> Self {
        match e {
            PostgresError::Database(e) => Self::Postgres(e),
            PostgresError::MigrationFailed {
                version,
                name,
                error,
            } => Self::MigrationFailed {
                version,
                name,
                error,
            },
            PostgresError::Config(msg) => Self::Config(msg),
            PostgresError::Conflict(msg) => Self::Conflict(msg),
            PostgresError::CorruptRow(msg) => Self::CorruptRow(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_postgres_error_preserves_variant() {
        let err: DataError = PostgresError::Conflict("dup".into()).into();
        assert!(matches!(err, DataError::Conflict(ref m) if m == "dup"));

        let err: DataError = PostgresError::MigrationFailed {
            version: 2,
            name: "x".into(),
            error: "boom".into(),
        }
        .into();
        assert_eq!(err.to_string(), "Migration 2 (x) failed: boom");
    }

    #[test]
    fn test_is_transient() {
        assert!(DataError::Postgres(sqlx::Error::PoolTimedOut).is_transient());
        assert!(!DataError::Postgres(sqlx::Error::RowNotFound).is_transient());
        assert!(!DataError::Config("bad config".into()).is_transient());
    }
}
