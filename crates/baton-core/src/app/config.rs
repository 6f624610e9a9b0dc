//! Dispatcher configuration loaded from `baton.toml`.
//!
//! Missing fields use defaults. `BATON_TICK_INTERVAL_MS` overrides the tick
//! interval from the file.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const TICK_INTERVAL_ENV: &str = "BATON_TICK_INTERVAL_MS";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid BATON_TICK_INTERVAL_MS={0:?}")]
    InvalidEnv(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// Worker threads are named `<prefix>-worker-<ulid>`.
    #[serde(default = "default_thread_name_prefix")]
    pub thread_name_prefix: String,

    /// Stack size for worker threads in bytes. `None` uses the std default.
    #[serde(default)]
    pub stack_size: Option<usize>,

    /// Frame length used by `Ticker` when the host has no frame loop.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

fn default_thread_name_prefix() -> String {
    "baton".to_string()
}

fn default_tick_interval_ms() -> u64 {
    16
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            thread_name_prefix: default_thread_name_prefix(),
            stack_size: None,
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

impl DispatcherConfig {
    /// Load from `path`, falling back to defaults if the file does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.display().to_string(),
                source,
            })?;
            Self::from_toml(&contents)?
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Self::default()
        };

        if let Ok(raw) = std::env::var(TICK_INTERVAL_ENV) {
            config.apply_tick_interval_override(&raw)?;
        }

        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    fn apply_tick_interval_override(&mut self, raw: &str) -> Result<(), ConfigError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(());
        }
        self.tick_interval_ms = raw
            .parse()
            .map_err(|_| ConfigError::InvalidEnv(raw.to_string()))?;
        Ok(())
    }
}
