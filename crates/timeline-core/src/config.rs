//! Configuration loading and typed config structures for Timeline.
//!
//! Configuration lives in a YAML file (by convention
//! `timeline-config.yaml`). Every section and field has a default, so an
//! empty file is a valid configuration.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use timeline_types::KeyScheme;

use crate::fanout::DEFAULT_MAX_CONCURRENCY;

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
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TimelineConfig {
    /// List store connection.
    #[serde(default)]
    pub store: StoreConfig,

    /// Log and relation key naming.
    #[serde(default)]
    pub keys: KeyScheme,

    /// Fan-out behavior.
    #[serde(default)]
    pub fanout: FanoutConfig,

    /// NATS relay settings.
    #[serde(default)]
    pub relay: RelayConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl TimelineConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values for connection URLs:
    /// - `REDIS_URL` overrides `store.url`
    /// - `NATS_URL` overrides `relay.nats_url`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse_yaml(&contents)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a YAML string, applying the same
    /// environment overrides as [`TimelineConfig::from_file`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config = Self::parse_yaml(yaml)?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn parse_yaml(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Apply `REDIS_URL` and `NATS_URL` overrides.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("REDIS_URL") {
            self.store.url = val;
        }
        if let Ok(val) = std::env::var("NATS_URL") {
            self.relay.nats_url = val;
        }
    }
}

/// List store connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StoreConfig {
    /// Redis URL (`redis://host:port/db`).
    #[serde(default = "default_store_url")]
    pub url: String,

    /// Upper bound for every store command, in milliseconds.
    #[serde(default = "default_command_timeout_ms")]
    pub command_timeout_ms: u64,
}

impl StoreConfig {
    /// Command timeout as a [`Duration`].
    pub const fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: default_store_url(),
            command_timeout_ms: default_command_timeout_ms(),
        }
    }
}

/// Fan-out settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FanoutConfig {
    /// Appends in flight per delivery.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Store relation holding an actor's followers.
    #[serde(default = "default_followers_relation")]
    pub followers_relation: String,
}

impl Default for FanoutConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            followers_relation: default_followers_relation(),
        }
    }
}

/// NATS relay settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RelayConfig {
    /// NATS server URL.
    #[serde(default = "default_nats_url")]
    pub nats_url: String,

    /// Subject carrying track requests.
    #[serde(default = "default_subject")]
    pub subject: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            nats_url: default_nats_url(),
            subject: default_subject(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

fn default_store_url() -> String {
    "redis://localhost:6379".to_owned()
}

const fn default_command_timeout_ms() -> u64 {
    2_000
}

const fn default_max_concurrency() -> usize {
    DEFAULT_MAX_CONCURRENCY
}

fn default_followers_relation() -> String {
    "followers".to_owned()
}

fn default_nats_url() -> String {
    "nats://localhost:4222".to_owned()
}

fn default_subject() -> String {
    "timeline.track".to_owned()
}

fn default_log_level() -> String {
    "info".to_owned()
}
