//! Runtime configuration for the sync process.
//!
//! Values come from defaults, then an optional JSON file, then `CANOPY_*`
//! environment variables, later sources winning.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::sync::services::EngineSettings;

/// Environment variable toggling the operation queue.
pub const ENV_ONLINE_SYNC: &str = "CANOPY_ONLINE_SYNC";
/// Environment variable for the cycle interval in seconds.
pub const ENV_DRAIN_INTERVAL_SECS: &str = "CANOPY_DRAIN_INTERVAL_SECS";
/// Environment variable for the remote call budget in seconds.
pub const ENV_REMOTE_TIMEOUT_SECS: &str = "CANOPY_REMOTE_TIMEOUT_SECS";
/// Environment variable for the local database path.
pub const ENV_LOCAL_DB: &str = "CANOPY_LOCAL_DB";
/// Environment variable for the remote database URL.
pub const ENV_REMOTE_URL: &str = "CANOPY_REMOTE_URL";

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("cannot read config file {path}: {source}")]
    Read {
        /// File path.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The configuration file is not valid JSON for [`SyncConfig`].
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),

    /// An environment override could not be parsed.
    #[error("invalid value {value:?} for {key}")]
    InvalidEnv {
        /// Variable name.
        key: &'static str,
        /// Raw value.
        value: String,
    },

    /// An interval or timeout was zero.
    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
}

/// Sync process settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncConfig {
    /// Record local changes in the operation queue.
    pub online_sync: bool,
    /// Seconds between sync cycles.
    pub drain_interval_secs: u64,
    /// Seconds allowed for each remote call.
    pub remote_timeout_secs: u64,
    /// Path of the `SQLite` database holding entities and the queue.
    pub local_database_path: String,
    /// `PostgreSQL` URL of the remote store; sync is local-only without it.
    pub remote_database_url: Option<String>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            online_sync: true,
            drain_interval_secs: 10,
            remote_timeout_secs: 5,
            local_database_path: "canopy.db".to_owned(),
            remote_database_url: None,
        }
    }
}

impl SyncConfig {
    /// Parses a JSON document; absent fields keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON or unknown fields.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Loads the optional file at `path`, then applies process environment
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file is unreadable or any value is
    /// invalid.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let base = match path {
            Some(file) => {
                let raw = std::fs::read_to_string(file).map_err(|source| ConfigError::Read {
                    path: file.display().to_string(),
                    source,
                })?;
                info!(path = %file.display(), "loaded config file");
                Self::from_json_str(&raw)?
            }
            None => Self::default(),
        };
        base.with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies `CANOPY_*` overrides read through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEnv`] for unparsable values or
    /// [`ConfigError::ZeroDuration`] for zero durations.
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(value) = lookup(ENV_ONLINE_SYNC) {
            self.online_sync = parse_flag(ENV_ONLINE_SYNC, value)?;
        }
        if let Some(value) = lookup(ENV_DRAIN_INTERVAL_SECS) {
            self.drain_interval_secs = parse_secs(ENV_DRAIN_INTERVAL_SECS, value)?;
        }
        if let Some(value) = lookup(ENV_REMOTE_TIMEOUT_SECS) {
            self.remote_timeout_secs = parse_secs(ENV_REMOTE_TIMEOUT_SECS, value)?;
        }
        if let Some(value) = lookup(ENV_LOCAL_DB) {
            self.local_database_path = value;
        }
        if let Some(value) = lookup(ENV_REMOTE_URL) {
            self.remote_database_url = Some(value).filter(|url| !url.trim().is_empty());
        }
        self.validate()
    }

    /// Returns the engine timing derived from this config.
    #[must_use]
    pub const fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            drain_interval: Duration::from_secs(self.drain_interval_secs),
            remote_timeout: Duration::from_secs(self.remote_timeout_secs),
        }
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.drain_interval_secs == 0 {
            return Err(ConfigError::ZeroDuration("drain_interval_secs"));
        }
        if self.remote_timeout_secs == 0 {
            return Err(ConfigError::ZeroDuration("remote_timeout_secs"));
        }
        Ok(self)
    }
}

fn parse_flag(key: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidEnv { key, value }),
    }
}

fn parse_secs(key: &'static str, value: String) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnv { key, value })
}
