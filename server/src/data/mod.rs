//! Data storage layer
//!
//! Control-plane persistence only:
//! - `postgres` - Control-plane PostgreSQL service, migrations and repositories
//! - `types` - Row types shared by repositories and callers
//! - `traits` - Repository traits consumed by the engine and domain layers
//! - `error` - Unified error type
//!
//! Tenant databases are never touched from here; see `crate::engine`.

pub mod error;
#[cfg(test)]
pub mod memory;
pub mod postgres;
pub mod traits;
pub mod types;

pub use error::DataError;
pub use postgres::PostgresService;
pub use traits::ProjectRepository;
pub use types::{ProjectRow, ProjectStatus};
