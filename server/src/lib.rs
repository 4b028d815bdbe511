//! Basalt: per-project PostgreSQL databases with a validated schema API
//!
//! - `core` - CLI, configuration, constants and shutdown
//! - `data` - control-plane database and project registry
//! - `domain` - project provisioning
//! - `engine` - the multi-tenant dynamic schema engine
//! - `utils` - shared helpers

mod app;
pub mod core;
pub mod data;
pub mod domain;
pub mod engine;
pub mod utils;
