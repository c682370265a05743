//! Configuration management for the vendor maintenance worker.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides.

use crate::error::{ConfigError, ConfigResult};
use crate::types::QueueKind;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main worker configuration.
///
/// This is loaded from `~/.config/vendmon/config.toml` (or platform equivalent).
/// If the file doesn't exist, default values are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Message broker connection settings
    pub broker: BrokerConfig,
    /// Queue names and polling
    pub queues: QueueConfig,
    /// Persistence settings
    pub database: DatabaseConfig,
    /// Vendor catalog and call settings
    pub vendors: VendorsConfig,
    /// Consume loop supervision
    pub supervisor: SupervisorConfig,
}

impl AppConfig {
    /// Load configuration from disk, falling back to defaults if not found.
    ///
    /// # Errors
    /// Returns error if:
    /// - Config directory cannot be determined
    /// - File exists but cannot be read
    /// - File contents are not valid TOML
    pub fn load() -> ConfigResult<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration from an explicit file path.
    ///
    /// Unlike [`AppConfig::load`], a missing file is an error here.
    pub fn load_from(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.display().to_string(),
            });
        }

        tracing::debug!("Loading config from {}", path.display());
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides.
    ///
    /// Supports the following environment variables:
    /// - `VENDMON_CONFIG`: Explicit config file path
    /// - `VENDMON_MQ_HOST`: Override broker host
    /// - `VENDMON_MQ_PORT`: Override broker port
    /// - `VENDMON_DATABASE_URL`: Override database URL
    /// - `VENDMON_CATALOG_DIR`: Override vendor catalog directory
    pub fn load_with_env() -> ConfigResult<Self> {
        let mut config = match std::env::var("VENDMON_CONFIG") {
            Ok(path) => Self::load_from(path)?,
            Err(_) => Self::load()?,
        };

        config.apply_env_overrides(|key| std::env::var(key).ok())?;

        Ok(config)
    }

    /// Apply overrides from a variable lookup.
    ///
    /// Split from [`AppConfig::load_with_env`] so the override rules can be
    /// exercised without touching the process environment.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("VENDMON_MQ_HOST") {
            tracing::debug!("Override broker.host from env: {}", host);
            self.broker.host = host;
        }

        if let Some(val) = lookup("VENDMON_MQ_PORT") {
            self.broker.port = val.parse().map_err(|_| ConfigError::InvalidValue {
                field: "broker.port".to_string(),
                reason: format!("'{val}' is not a valid port"),
            })?;
            tracing::debug!("Override broker.port from env: {}", self.broker.port);
        }

        if let Some(url) = lookup("VENDMON_DATABASE_URL") {
            tracing::debug!("Override database.url from env");
            self.database.url = url;
        }

        if let Some(dir) = lookup("VENDMON_CATALOG_DIR") {
            tracing::debug!("Override vendors.catalog_dir from env: {}", dir);
            self.vendors.catalog_dir = PathBuf::from(dir);
        }

        Ok(())
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/vendmon/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs = ProjectDirs::from("com", "vendmon", "vendmon").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Get the data directory path.
    ///
    /// Uses XDG base directories: `~/.local/share/vendmon`
    pub fn data_dir() -> ConfigResult<PathBuf> {
        let dirs = ProjectDirs::from("com", "vendmon", "vendmon").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.data_dir().to_path_buf())
    }

    /// Queue name configured for a queue kind.
    #[must_use]
    pub fn queue_name(&self, kind: QueueKind) -> &str {
        match kind {
            QueueKind::VpInfo => &self.queues.vpinfo,
            QueueKind::VpMap => &self.queues.vpmap,
        }
    }
}

/// Message broker (AMQP) connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// Broker host name
    pub host: String,
    /// Broker port
    pub port: u16,
    /// Login user
    pub username: String,
    /// Login password
    pub password: String,
    /// AMQP virtual host
    pub virtual_host: String,
    /// Unacknowledged deliveries the broker may push per consumer
    pub prefetch: u16,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5672,
            username: "guest".to_string(),
            password: "guest".to_string(),
            virtual_host: "/".to_string(),
            prefetch: 1,
        }
    }
}

impl BrokerConfig {
    /// Build the `amqp://` URI for this broker.
    ///
    /// Credentials and the virtual host are percent-encoded, so reserved
    /// characters such as `@`, `/` and `:` survive URI parsing.
    #[must_use]
    pub fn amqp_uri(&self) -> String {
        let vhost = if self.virtual_host == "/" {
            "/"
        } else {
            self.virtual_host.trim_start_matches('/')
        };
        format!(
            "amqp://{}:{}@{}:{}/{}",
            urlencoding::encode(&self.username),
            urlencoding::encode(&self.password),
            self.host,
            self.port,
            urlencoding::encode(vhost)
        )
    }
}

/// Queue names and consume loop polling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Info-refresh queue name
    pub vpinfo: String,
    /// Mapping queue name
    pub vpmap: String,
    /// Idle wait before the consume loop polls again, in milliseconds
    pub idle_poll_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            vpinfo: QueueKind::VpInfo.default_queue_name().to_string(),
            vpmap: QueueKind::VpMap.default_queue_name().to_string(),
            idle_poll_ms: 10,
        }
    }
}

impl QueueConfig {
    /// Idle poll interval as a `Duration`.
    #[must_use]
    pub fn idle_poll_interval(&self) -> Duration {
        Duration::from_millis(self.idle_poll_ms.max(1))
    }
}

/// Persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `SQLite` URL or path; empty means `<data_dir>/vendmon.db`
    pub url: String,
    /// Maximum pooled connections
    pub max_connections: u32,
    /// How long a writer waits on a locked database, in milliseconds
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 5,
            busy_timeout_ms: 5000,
        }
    }
}

impl DatabaseConfig {
    /// Resolve the database URL, defaulting to the XDG data directory.
    ///
    /// The data directory is created when the default location is used.
    pub fn resolved_url(&self) -> ConfigResult<String> {
        if self.url.is_empty() {
            let dir = AppConfig::data_dir()?;
            fs::create_dir_all(&dir)?;
            Ok(format!("sqlite://{}", dir.join("vendmon.db").display()))
        } else {
            Ok(self.url.clone())
        }
    }
}

/// Vendor catalog and vendor call settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VendorsConfig {
    /// Directory holding vendor catalog TOML files
    pub catalog_dir: PathBuf,
    /// Upper bound for a single vendor call in seconds (0 = unbounded)
    pub call_timeout_secs: u64,
}

impl Default for VendorsConfig {
    fn default() -> Self {
        Self {
            catalog_dir: PathBuf::from("vendor-catalogs"),
            call_timeout_secs: 0,
        }
    }
}

impl VendorsConfig {
    /// Vendor call timeout, `None` when calls are unbounded.
    #[must_use]
    pub fn call_timeout(&self) -> Option<Duration> {
        (self.call_timeout_secs > 0).then(|| Duration::from_secs(self.call_timeout_secs))
    }
}

/// Consume loop supervision.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
    /// Delay before a failed loop re-subscribes, in seconds (0 = leave it stopped)
    pub restart_delay_secs: u64,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            restart_delay_secs: 5,
        }
    }
}

impl SupervisorConfig {
    /// Restart delay, `None` when failed loops stay stopped.
    #[must_use]
    pub fn restart_delay(&self) -> Option<Duration> {
        (self.restart_delay_secs > 0).then(|| Duration::from_secs(self.restart_delay_secs))
    }
}
