// =============================================================================
// Application Identity
// =============================================================================

/// Application name in lowercase (for paths, identifiers and log filters)
pub const APP_NAME_LOWER: &str = "basalt";

/// Unix-style dotfile folder name
pub const APP_DOT_FOLDER: &str = ".basalt";

// =============================================================================
// Configuration Files
// =============================================================================

/// Config file name
pub const CONFIG_FILE_NAME: &str = "basalt.json";

/// Environment variable for config file path
pub const ENV_CONFIG: &str = "BASALT_CONFIG";

// =============================================================================
// Environment Variables - General
// =============================================================================

/// Environment variable for debug mode
pub const ENV_DEBUG: &str = "BASALT_DEBUG";

/// Environment variable for log level/filter
pub const ENV_LOG: &str = "BASALT_LOG";

// =============================================================================
// Environment Variables - Databases
// =============================================================================

/// Control-plane PostgreSQL connection URL
pub const ENV_CONTROL_URL: &str = "BASALT_CONTROL_URL";

/// Prefix for physical tenant database names
pub const ENV_TENANT_DATABASE_PREFIX: &str = "BASALT_TENANT_DATABASE_PREFIX";

/// Default deadline for schema operations, in seconds
pub const ENV_OPERATION_TIMEOUT_SECS: &str = "BASALT_OPERATION_TIMEOUT_SECS";

/// PostgreSQL URL used by the live-database test suite (tests are skipped when unset)
pub const ENV_TEST_POSTGRES_URL: &str = "BASALT_TEST_POSTGRES_URL";

// =============================================================================
// Control-Plane PostgreSQL Defaults
// =============================================================================

/// Default max connections for the control-plane pool
pub const POSTGRES_DEFAULT_MAX_CONNECTIONS: u32 = 20;

/// Default min connections kept warm
pub const POSTGRES_DEFAULT_MIN_CONNECTIONS: u32 = 2;

/// Default connection acquire timeout (seconds)
pub const POSTGRES_DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 30;

/// Default idle connection timeout (seconds)
pub const POSTGRES_DEFAULT_IDLE_TIMEOUT_SECS: u64 = 600;

/// Default max connection lifetime (seconds)
pub const POSTGRES_DEFAULT_MAX_LIFETIME_SECS: u64 = 1800;

/// Default statement timeout (seconds, 0 = disabled)
pub const POSTGRES_DEFAULT_STATEMENT_TIMEOUT_SECS: u64 = 60;

/// Interval between control-plane health checks (seconds)
pub const POSTGRES_HEALTH_CHECK_INTERVAL_SECS: u64 = 60;

// =============================================================================
// Tenant Database Defaults
// =============================================================================

/// Default max connections per tenant pool
///
/// Tenant pools are created per project, so this stays small.
pub const TENANT_DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Default acquire timeout for tenant pools (seconds)
pub const TENANT_DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 10;

/// Default idle timeout for tenant connections (seconds)
pub const TENANT_DEFAULT_IDLE_TIMEOUT_SECS: u64 = 300;

/// Default physical database name prefix (`<prefix>_<project uuid>`)
pub const TENANT_DEFAULT_DATABASE_PREFIX: &str = "tenant";

/// Default deadline for one schema operation (seconds)
pub const DEFAULT_OPERATION_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// Shutdown
// =============================================================================

/// Max time to wait for background tasks during shutdown (seconds)
pub const SHUTDOWN_TIMEOUT_SECS: u64 = 30;
