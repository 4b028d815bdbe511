use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::utils::file::expand_path;

use super::cli::CliConfig;
use super::constants::{
    APP_DOT_FOLDER, CONFIG_FILE_NAME, DEFAULT_OPERATION_TIMEOUT_SECS,
    POSTGRES_DEFAULT_ACQUIRE_TIMEOUT_SECS, POSTGRES_DEFAULT_IDLE_TIMEOUT_SECS,
    POSTGRES_DEFAULT_MAX_CONNECTIONS, POSTGRES_DEFAULT_MAX_LIFETIME_SECS,
    POSTGRES_DEFAULT_MIN_CONNECTIONS, POSTGRES_DEFAULT_STATEMENT_TIMEOUT_SECS,
    TENANT_DEFAULT_ACQUIRE_TIMEOUT_SECS, TENANT_DEFAULT_DATABASE_PREFIX,
    TENANT_DEFAULT_IDLE_TIMEOUT_SECS, TENANT_DEFAULT_MAX_CONNECTIONS,
};

// =============================================================================
// File Config (JSON)
// =============================================================================

/// Control-plane PostgreSQL section (from JSON config file)
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ControlFileConfig {
    /// PostgreSQL connection URL (or use BASALT_CONTROL_URL env var)
    pub url: Option<String>,
    /// Maximum number of connections in the pool (default: 20)
    pub max_connections: Option<u32>,
    /// Minimum number of connections to keep warm (default: 2)
    pub min_connections: Option<u32>,
    /// Connection acquire timeout in seconds (default: 30)
    pub acquire_timeout_secs: Option<u64>,
    /// Idle connection timeout in seconds (default: 600)
    pub idle_timeout_secs: Option<u64>,
    /// Max connection lifetime in seconds (default: 1800)
    pub max_lifetime_secs: Option<u64>,
    /// Statement timeout in seconds, 0 to disable (default: 60)
    pub statement_timeout_secs: Option<u64>,
}

/// Tenant database section (from JSON config file)
#[derive(Debug, Default, Clone, Deserialize)]
pub struct TenantsFileConfig {
    /// Physical database name prefix (default: "tenant")
    pub database_prefix: Option<String>,
    /// Max connections per tenant pool (default: 5)
    pub max_connections: Option<u32>,
    /// Tenant pool acquire timeout in seconds (default: 10)
    pub acquire_timeout_secs: Option<u64>,
    /// Tenant idle connection timeout in seconds (default: 300)
    pub idle_timeout_secs: Option<u64>,
    /// Default deadline for one schema operation in seconds (default: 30)
    pub operation_timeout_secs: Option<u64>,
}

/// File-based configuration (JSON)
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub control: Option<ControlFileConfig>,
    pub tenants: Option<TenantsFileConfig>,
    pub debug: Option<bool>,
    #[serde(flatten)]
    pub extra: serde_json::Value,
}

impl FileConfig {
    /// Load configuration from a JSON file
    fn load_from_file(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "Loading config file");
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        tracing::trace!(config = ?config, "Parsed config file");
        Ok(config)
    }

    /// Warn about unknown fields in the config
    fn warn_unknown_fields(&self) {
        if let serde_json::Value::Object(map) = &self.extra
            && !map.is_empty()
        {
            let keys_str: String = map
                .keys()
                .map(|k| k.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            tracing::warn!(
                fields = %keys_str,
                "Unknown fields in config file (possible typos)"
            );
        }
    }

    /// Merge another FileConfig into this one (other takes precedence)
    fn merge(&mut self, other: FileConfig) {
        // Control plane
        if let Some(control) = other.control {
            let current = self.control.get_or_insert_with(ControlFileConfig::default);
            if control.url.is_some() {
                tracing::trace!("Merging control.url");
                current.url = control.url;
            }
            if control.max_connections.is_some() {
                tracing::trace!(max_connections = ?control.max_connections, "Merging control.max_connections");
                current.max_connections = control.max_connections;
            }
            if control.min_connections.is_some() {
                tracing::trace!(min_connections = ?control.min_connections, "Merging control.min_connections");
                current.min_connections = control.min_connections;
            }
            if control.acquire_timeout_secs.is_some() {
                tracing::trace!(acquire_timeout_secs = ?control.acquire_timeout_secs, "Merging control.acquire_timeout_secs");
                current.acquire_timeout_secs = control.acquire_timeout_secs;
            }
            if control.idle_timeout_secs.is_some() {
                tracing::trace!(idle_timeout_secs = ?control.idle_timeout_secs, "Merging control.idle_timeout_secs");
                current.idle_timeout_secs = control.idle_timeout_secs;
            }
            if control.max_lifetime_secs.is_some() {
                tracing::trace!(max_lifetime_secs = ?control.max_lifetime_secs, "Merging control.max_lifetime_secs");
                current.max_lifetime_secs = control.max_lifetime_secs;
            }
            if control.statement_timeout_secs.is_some() {
                tracing::trace!(statement_timeout_secs = ?control.statement_timeout_secs, "Merging control.statement_timeout_secs");
                current.statement_timeout_secs = control.statement_timeout_secs;
            }
        }

        // Tenants
        if let Some(tenants) = other.tenants {
            let current = self.tenants.get_or_insert_with(TenantsFileConfig::default);
            if tenants.database_prefix.is_some() {
                tracing::trace!(database_prefix = ?tenants.database_prefix, "Merging tenants.database_prefix");
                current.database_prefix = tenants.database_prefix;
            }
            if tenants.max_connections.is_some() {
                tracing::trace!(max_connections = ?tenants.max_connections, "Merging tenants.max_connections");
                current.max_connections = tenants.max_connections;
            }
            if tenants.acquire_timeout_secs.is_some() {
                tracing::trace!(acquire_timeout_secs = ?tenants.acquire_timeout_secs, "Merging tenants.acquire_timeout_secs");
                current.acquire_timeout_secs = tenants.acquire_timeout_secs;
            }
            if tenants.idle_timeout_secs.is_some() {
                tracing::trace!(idle_timeout_secs = ?tenants.idle_timeout_secs, "Merging tenants.idle_timeout_secs");
                current.idle_timeout_secs = tenants.idle_timeout_secs;
            }
            if tenants.operation_timeout_secs.is_some() {
                tracing::trace!(operation_timeout_secs = ?tenants.operation_timeout_secs, "Merging tenants.operation_timeout_secs");
                current.operation_timeout_secs = tenants.operation_timeout_secs;
            }
        }

        if other.debug.is_some() {
            tracing::trace!(debug = ?other.debug, "Merging debug");
            self.debug = other.debug;
        }
    }
}

// =============================================================================
// Runtime Config
// =============================================================================

/// Control-plane PostgreSQL configuration (final/runtime)
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// PostgreSQL connection URL
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of connections to keep warm
    pub min_connections: u32,
    /// Connection acquire timeout in seconds
    pub acquire_timeout_secs: u64,
    /// Idle connection timeout in seconds
    pub idle_timeout_secs: u64,
    /// Max connection lifetime in seconds
    pub max_lifetime_secs: u64,
    /// Statement timeout in seconds (0 = disabled)
    pub statement_timeout_secs: u64,
}

/// Tenant database configuration (final/runtime)
#[derive(Debug, Clone)]
pub struct TenantConfig {
    pub database_prefix: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub operation_timeout_secs: u64,
}

impl TenantConfig {
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }
}

impl Default for TenantConfig {
    fn default() -> Self {
        Self {
            database_prefix: TENANT_DEFAULT_DATABASE_PREFIX.to_string(),
            max_connections: TENANT_DEFAULT_MAX_CONNECTIONS,
            acquire_timeout_secs: TENANT_DEFAULT_ACQUIRE_TIMEOUT_SECS,
            idle_timeout_secs: TENANT_DEFAULT_IDLE_TIMEOUT_SECS,
            operation_timeout_secs: DEFAULT_OPERATION_TIMEOUT_SECS,
        }
    }
}

/// Final merged application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub control: PostgresConfig,
    pub tenants: TenantConfig,
    pub debug: bool,
}

impl AppConfig {
    /// Load configuration from all sources
    ///
    /// Priority (lowest to highest):
    /// 1. Defaults
    /// 2. Profile directory config (~/.basalt/basalt.json)
    /// 3. Local directory config OR CLI-specified config path
    /// 4. CLI arguments (which include env var fallbacks via clap)
    pub fn load(cli: &CliConfig) -> Result<Self> {
        tracing::debug!("Loading application configuration");
        tracing::trace!(cli = ?cli, "CLI config");

        let mut file_config = FileConfig::default();
        let mut found_configs: Vec<String> = Vec::new();

        // 1. Load from profile dir (~/.basalt/basalt.json) - skip if not exists
        if let Some(profile_path) = get_profile_config_path()
            && profile_path.exists()
        {
            let profile_config = FileConfig::load_from_file(&profile_path)?;
            profile_config.warn_unknown_fields();
            file_config.merge(profile_config);
            found_configs.push(profile_path.display().to_string());
        }

        // 2. Load from CLI-specified path OR local directory
        let overlay_path = if let Some(ref path) = cli.config {
            let expanded = expand_path(&path.to_string_lossy());
            if !expanded.exists() {
                anyhow::bail!("Config file not found: {}", expanded.display());
            }
            Some(expanded)
        } else {
            let local = PathBuf::from(CONFIG_FILE_NAME);
            if local.exists() { Some(local) } else { None }
        };

        if let Some(path) = overlay_path {
            let overlay_config = FileConfig::load_from_file(&path)?;
            overlay_config.warn_unknown_fields();
            file_config.merge(overlay_config);
            found_configs.push(path.display().to_string());
        }

        tracing::debug!(configs = ?found_configs, "Config files loaded");

        Self::from_layers(cli, file_config)
    }

    /// Layer configs: defaults -> file config -> CLI/env overrides
    fn from_layers(cli: &CliConfig, file_config: FileConfig) -> Result<Self> {
        let file_control = file_config.control.unwrap_or_default();
        let file_tenants = file_config.tenants.unwrap_or_default();
        let defaults = TenantConfig::default();

        let control = PostgresConfig {
            url: cli
                .control_url
                .clone()
                .or(file_control.url)
                .unwrap_or_default(),
            max_connections: file_control
                .max_connections
                .unwrap_or(POSTGRES_DEFAULT_MAX_CONNECTIONS),
            min_connections: file_control
                .min_connections
                .unwrap_or(POSTGRES_DEFAULT_MIN_CONNECTIONS),
            acquire_timeout_secs: file_control
                .acquire_timeout_secs
                .unwrap_or(POSTGRES_DEFAULT_ACQUIRE_TIMEOUT_SECS),
            idle_timeout_secs: file_control
                .idle_timeout_secs
                .unwrap_or(POSTGRES_DEFAULT_IDLE_TIMEOUT_SECS),
            max_lifetime_secs: file_control
                .max_lifetime_secs
                .unwrap_or(POSTGRES_DEFAULT_MAX_LIFETIME_SECS),
            statement_timeout_secs: file_control
                .statement_timeout_secs
                .unwrap_or(POSTGRES_DEFAULT_STATEMENT_TIMEOUT_SECS),
        };

        let tenants = TenantConfig {
            database_prefix: cli
                .tenant_database_prefix
                .clone()
                .or(file_tenants.database_prefix)
                .unwrap_or(defaults.database_prefix),
            max_connections: file_tenants
                .max_connections
                .unwrap_or(defaults.max_connections),
            acquire_timeout_secs: file_tenants
                .acquire_timeout_secs
                .unwrap_or(defaults.acquire_timeout_secs),
            idle_timeout_secs: file_tenants
                .idle_timeout_secs
                .unwrap_or(defaults.idle_timeout_secs),
            operation_timeout_secs: cli
                .operation_timeout_secs
                .or(file_tenants.operation_timeout_secs)
                .unwrap_or(defaults.operation_timeout_secs),
        };

        // debug: CLI/env flag takes precedence, then file config, default false
        let debug = cli.debug || file_config.debug.unwrap_or(false);

        let config = Self {
            control,
            tenants,
            debug,
        };
        config.validate()?;

        tracing::debug!(
            tenant_prefix = %config.tenants.database_prefix,
            operation_timeout_secs = config.tenants.operation_timeout_secs,
            debug = config.debug,
            "Configuration loaded"
        );
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let url = self.control.url.as_str();
        if !url.is_empty() && !(url.starts_with("postgres://") || url.starts_with("postgresql://"))
        {
            anyhow::bail!(
                "Configuration error: control.url must start with postgres:// or postgresql://"
            );
        }

        if self.control.max_connections == 0 {
            anyhow::bail!("Configuration error: control.max_connections must be greater than 0");
        }
        if self.control.min_connections > self.control.max_connections {
            anyhow::bail!(
                "Configuration error: control.min_connections ({}) exceeds control.max_connections ({})",
                self.control.min_connections,
                self.control.max_connections
            );
        }

        let prefix = self.tenants.database_prefix.as_str();
        let prefix_ok = (1..=20).contains(&prefix.len())
            && prefix.starts_with(|c: char| c.is_ascii_lowercase())
            && prefix
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
        if !prefix_ok {
            anyhow::bail!(
                "Configuration error: tenants.database_prefix '{}' must be 1-20 lowercase letters, digits or underscores, starting with a letter",
                prefix
            );
        }

        if self.tenants.max_connections == 0 {
            anyhow::bail!("Configuration error: tenants.max_connections must be greater than 0");
        }
        if self.tenants.operation_timeout_secs == 0 {
            anyhow::bail!(
                "Configuration error: tenants.operation_timeout_secs must be greater than 0"
            );
        }

        Ok(())
    }

    /// Control-plane URL, required by every command that touches a database
    pub fn require_control_url(&self) -> Result<&str> {
        if self.control.url.is_empty() {
            anyhow::bail!(
                "Configuration error: control.url is required (set --control-url or BASALT_CONTROL_URL)"
            );
        }
        Ok(&self.control.url)
    }
}

/// Get the profile config path (~/.basalt/basalt.json)
fn get_profile_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(APP_DOT_FOLDER).join(CONFIG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layered(cli: &CliConfig, json: &str) -> Result<AppConfig> {
        let file: FileConfig = serde_json::from_str(json).unwrap();
        AppConfig::from_layers(cli, file)
    }

    #[test]
    fn test_file_config_parse_full() {
        let json = r#"{
            "control": { "url": "postgres://localhost/control", "max_connections": 8 },
            "tenants": { "database_prefix": "proj", "operation_timeout_secs": 10 },
            "debug": true
        }"#;
        let config: FileConfig = serde_json::from_str(json).unwrap();

        let control = config.control.as_ref().unwrap();
        assert_eq!(control.url.as_deref(), Some("postgres://localhost/control"));
        assert_eq!(control.max_connections, Some(8));
        let tenants = config.tenants.as_ref().unwrap();
        assert_eq!(tenants.database_prefix.as_deref(), Some("proj"));
        assert_eq!(tenants.operation_timeout_secs, Some(10));
        assert_eq!(config.debug, Some(true));
    }

    #[test]
    fn test_file_config_parse_empty() {
        let config: FileConfig = serde_json::from_str("{}").unwrap();
        assert!(config.control.is_none());
        assert!(config.tenants.is_none());
    }

    #[test]
    fn test_file_config_parse_extra_fields() {
        let json = r#"{ "control": { "url": "postgres://h/db" }, "tenant": {} }"#;
        let config: FileConfig = serde_json::from_str(json).unwrap();
        assert!(config.extra.get("tenant").is_some());
    }

    #[test]
    fn test_file_config_merge() {
        let mut base: FileConfig = serde_json::from_str(
            r#"{
                "control": { "url": "postgres://base/control", "max_connections": 4 },
                "tenants": { "database_prefix": "base" }
            }"#,
        )
        .unwrap();
        let overlay: FileConfig = serde_json::from_str(
            r#"{
                "control": { "max_connections": 16 },
                "tenants": { "operation_timeout_secs": 5 },
                "debug": true
            }"#,
        )
        .unwrap();

        base.merge(overlay);

        let control = base.control.unwrap();
        assert_eq!(control.url.as_deref(), Some("postgres://base/control"));
        assert_eq!(control.max_connections, Some(16));
        let tenants = base.tenants.unwrap();
        assert_eq!(tenants.database_prefix.as_deref(), Some("base"));
        assert_eq!(tenants.operation_timeout_secs, Some(5));
        assert_eq!(base.debug, Some(true));
    }

    #[test]
    fn test_app_config_defaults() {
        let config = layered(&CliConfig::default(), "{}").unwrap();
        assert!(config.control.url.is_empty());
        assert_eq!(config.control.max_connections, POSTGRES_DEFAULT_MAX_CONNECTIONS);
        assert_eq!(config.tenants.database_prefix, TENANT_DEFAULT_DATABASE_PREFIX);
        assert_eq!(
            config.tenants.operation_timeout(),
            Duration::from_secs(DEFAULT_OPERATION_TIMEOUT_SECS)
        );
        assert!(!config.debug);
        assert!(config.require_control_url().is_err());
    }

    #[test]
    fn test_app_config_cli_override() {
        let cli = CliConfig {
            debug: true,
            config: None,
            control_url: Some("postgresql://cli/control".to_string()),
            tenant_database_prefix: Some("cli".to_string()),
            operation_timeout_secs: Some(3),
        };
        let config = layered(
            &cli,
            r#"{
                "control": { "url": "postgres://file/control" },
                "tenants": { "database_prefix": "file", "operation_timeout_secs": 60 }
            }"#,
        )
        .unwrap();
        assert_eq!(config.require_control_url().unwrap(), "postgresql://cli/control");
        assert_eq!(config.tenants.database_prefix, "cli");
        assert_eq!(config.tenants.operation_timeout_secs, 3);
        assert!(config.debug);
    }

    #[test]
    fn test_app_config_validation_bad_url_scheme() {
        let err = layered(
            &CliConfig::default(),
            r#"{ "control": { "url": "mysql://localhost/db" } }"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("control.url"));
    }

    #[test]
    fn test_app_config_validation_prefix() {
        for prefix in ["", "Tenant", "1tenant", "ten-ant", "a_really_long_tenant_prefix"] {
            let json = format!(r#"{{ "tenants": {{ "database_prefix": "{}" }} }}"#, prefix);
            assert!(layered(&CliConfig::default(), &json).is_err(), "{prefix}");
        }
        assert!(layered(&CliConfig::default(), r#"{ "tenants": { "database_prefix": "t_2" } }"#).is_ok());
    }

    #[test]
    fn test_app_config_validation_zero_timeout() {
        let cli = CliConfig {
            operation_timeout_secs: Some(0),
            ..Default::default()
        };
        assert!(layered(&cli, "{}").is_err());
    }

    #[test]
    fn test_app_config_validation_min_exceeds_max() {
        let err = layered(
            &CliConfig::default(),
            r#"{ "control": { "min_connections": 10, "max_connections": 2 } }"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("min_connections"));
    }

    #[test]
    fn test_app_config_load_from_cli_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.json");
        std::fs::write(
            &path,
            r#"{ "tenants": { "database_prefix": "fromfile", "max_connections": 2 } }"#,
        )
        .unwrap();

        let cli = CliConfig {
            config: Some(path),
            ..Default::default()
        };
        let config = AppConfig::load(&cli).unwrap();
        assert_eq!(config.tenants.database_prefix, "fromfile");
        assert_eq!(config.tenants.max_connections, 2);
    }

    #[test]
    fn test_app_config_load_missing_cli_path() {
        let cli = CliConfig {
            config: Some(PathBuf::from("/nonexistent/basalt.json")),
            ..Default::default()
        };
        assert!(AppConfig::load(&cli).is_err());
    }
}
