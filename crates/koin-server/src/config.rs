//! Configuration loading for the Koin server.
//!
//! The configuration lives in `koin-config.yaml` in the working directory.
//! Every section is optional and defaults to a local development setup
//! (in-memory store, built-in catalog, no webhook verification).
//!
//! Environment variables override the file:
//!
//! - `DATABASE_URL` sets `database.url` and selects the `postgres` backend
//! - `KOIN_HOST` / `KOIN_PORT` set `server.host` / `server.port`
//! - `KOIN_WEBHOOK_SECRET` sets `payments.webhook_secret`

use std::path::{Path, PathBuf};
use std::time::Duration;

use koin_db::postgres::{
    DEFAULT_ACQUIRE_TIMEOUT, DEFAULT_IDLE_TIMEOUT, DEFAULT_MAX_CONNECTIONS, PostgresConfig,
};
use koin_economy::EconomySettings;
use koin_types::KoinTier;
use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value is present but unusable.
    #[error("invalid config value for {key}: {reason}")]
    Invalid {
        /// The offending key.
        key: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level server configuration, mirroring `koin-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct KoinConfig {
    /// HTTP listener.
    #[serde(default)]
    pub server: ServerSection,

    /// Persistent store.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Wallet and quest tunables.
    #[serde(default)]
    pub economy: EconomySettings,

    /// Catalog source.
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Payment processor integration.
    #[serde(default)]
    pub payments: PaymentsConfig,

    /// Log output.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl KoinConfig {
    /// Load from a YAML file and apply environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if it is not valid YAML, or
    /// [`ConfigError::Invalid`] if an override cannot be parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&contents)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load `path` if it exists, defaults otherwise, then apply
    /// environment overrides.
    ///
    /// # Errors
    ///
    /// See [`KoinConfig::from_file`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            return Self::from_file(path);
        }
        tracing::info!(path = %path.display(), "Config file not found, using defaults");
        let mut config = Self::default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string. No environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Apply overrides from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `KOIN_PORT` is not a port number.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `KOIN_PORT` is not a port number.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("DATABASE_URL") {
            self.database.url = Some(url);
            self.database.backend = Backend::Postgres;
        }
        if let Some(host) = lookup("KOIN_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("KOIN_PORT") {
            self.server.port = port.parse().map_err(|e| ConfigError::Invalid {
                key: "KOIN_PORT",
                reason: format!("{port:?}: {e}"),
            })?;
        }
        if let Some(secret) = lookup("KOIN_WEBHOOK_SECRET") {
            self.payments.webhook_secret = Some(secret);
        }
        Ok(())
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerSection {
    /// Bind address.
    #[serde(default = "default_host")]
    pub host: String,
    /// TCP port.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Which store backs the repositories.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// Process-local [`MemoryStore`](koin_economy::MemoryStore). Data is
    /// lost on restart.
    #[default]
    Memory,
    /// `PostgreSQL` via `koin-db`.
    Postgres,
}

/// Persistent store settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DatabaseConfig {
    /// Store backend.
    #[serde(default)]
    pub backend: Backend,
    /// `PostgreSQL` URL, required for the `postgres` backend.
    #[serde(default)]
    pub url: Option<String>,
    /// Pool size.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Run migrations at startup.
    #[serde(default = "default_true")]
    pub run_migrations: bool,
    /// Seconds a request waits for a free connection.
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,
    /// Seconds before an unused connection is closed.
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
}

impl DatabaseConfig {
    /// Pool settings for `url`.
    pub fn pool_config(&self, url: &str) -> PostgresConfig {
        PostgresConfig::new(url)
            .with_max_connections(self.max_connections)
            .with_timeouts(
                Duration::from_secs(self.acquire_timeout_secs),
                Duration::from_secs(self.idle_timeout_secs),
            )
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            url: None,
            max_connections: default_max_connections(),
            run_migrations: true,
            acquire_timeout_secs: default_acquire_timeout_secs(),
            idle_timeout_secs: default_idle_timeout_secs(),
        }
    }
}

/// Catalog source settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CatalogConfig {
    /// YAML catalog file. The built-in catalog is used when unset.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Payment processor settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PaymentsConfig {
    /// Shared secret for webhook signatures. Unverified when unset.
    #[serde(default)]
    pub webhook_secret: Option<String>,
    /// Koins tiers replacing the catalog's.
    #[serde(default)]
    pub tiers: Option<Vec<KoinTier>>,
}

/// Log output settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_host() -> String {
    String::from("0.0.0.0")
}

const fn default_port() -> u16 {
    8080
}

const fn default_max_connections() -> u32 {
    DEFAULT_MAX_CONNECTIONS
}

const fn default_acquire_timeout_secs() -> u64 {
    DEFAULT_ACQUIRE_TIMEOUT.as_secs()
}

const fn default_idle_timeout_secs() -> u64 {
    DEFAULT_IDLE_TIMEOUT.as_secs()
}

const fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    String::from("info")
}
