//! Configuration for the roost registry.
//!
//! Read from `~/.config/roost/config.toml` at startup. If the file doesn't
//! exist, a commented default is written there. Missing fields fall back to
//! defaults.

use serde::Deserialize;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

use crate::bridge::DEFAULT_QUEUE_CAPACITY;
use crate::refresh::{DEFAULT_FETCH_TIMEOUT_SECS, DEFAULT_WORKERS};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Database path override. Defaults to the platform data dir.
    pub db_path: Option<PathBuf>,
    /// How often the daemon re-crawls every feed ("1h", "30m", "1d").
    pub refresh_interval: String,
    /// Per-feed fetch timeout during a refresh cycle, in seconds.
    pub fetch_timeout_secs: u64,
    /// Concurrent fetch workers per refresh cycle.
    pub workers: usize,
    /// Bounded capacity of the durable-write queue. A full queue drops the
    /// snapshot rather than blocking the caller.
    pub push_queue_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: None,
            refresh_interval: "1h".to_string(),
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            workers: DEFAULT_WORKERS,
            push_queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl Config {
    /// Load configuration from the default path, creating a commented
    /// default file if none exists.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::default_config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path).map_err(|e| ConfigError::Io {
            path: config_path.clone(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: config_path,
            source: e,
        })?;

        Ok(config)
    }

    /// `~/.config/roost/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("roost").join("config.toml"))
    }

    fn create_default_config(path: &PathBuf) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.clone(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.clone(),
                source: e,
            })?;

        Ok(())
    }

    fn default_config_content() -> String {
        r##"# Roost registry configuration

# Where the SQLite database lives. Defaults to the platform data
# directory (e.g. ~/.local/share/roost/roost.db) when unset.
# db_path = "/var/lib/roost/roost.db"

# How often the daemon re-crawls every registered feed.
# Accepts "30m", "1h", "6h", "1d", or raw seconds.
refresh_interval = "1h"

# Per-feed fetch timeout during a refresh cycle. A feed that exceeds it
# is skipped for that cycle and retried on the next one.
fetch_timeout_secs = 30

# Concurrent fetch workers per refresh cycle.
workers = 10

# Capacity of the durable-write queue. When full, a push is dropped and
# reported; the in-memory registry stays authoritative.
push_queue_capacity = 8
"##
        .to_string()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}
