//! Configuration for watchers and watched stores.
//!
//! Defaults mirror the intended deployment: a three second quiet period, a
//! one second poll, and write-ignores as long as the quiet period. Values can
//! come from a TOML file, from `LULLWATCH_*` environment variables, or both.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Global configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LullwatchConfig {
    /// Watcher loop timing
    pub watcher: WatcherConfig,
    /// Store write coordination
    pub store: StoreConfig,
}

/// Configuration for the watcher loop
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    /// Quiet period with no events before pending changes flush, in seconds
    pub quiet_period_secs: u64,
    /// Poll timeout in milliseconds; bounds flush-check granularity and
    /// worst-case stop latency
    pub poll_timeout_ms: u64,
}

/// Configuration for store write coordination
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// How long the watcher ignores a filename after a store marks it for
    /// writing, in seconds
    pub write_ignore_secs: u64,
}

impl Default for LullwatchConfig {
    fn default() -> Self {
        Self {
            watcher: WatcherConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            quiet_period_secs: 3,
            poll_timeout_ms: 1000,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            write_ignore_secs: 3,
        }
    }
}

impl WatcherConfig {
    /// Get the quiet period duration
    pub fn quiet_period(&self) -> Duration {
        Duration::from_secs(self.quiet_period_secs)
    }

    /// Get the poll timeout duration
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }
}

impl StoreConfig {
    /// Get the write-ignore duration
    pub fn write_ignore(&self) -> Duration {
        Duration::from_secs(self.write_ignore_secs)
    }
}

impl LullwatchConfig {
    /// Load configuration from a TOML file. Missing keys fall back to their
    /// defaults; a missing file is an error.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Load configuration from environment variables, starting from defaults.
    /// Unparsable values are ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("LULLWATCH_QUIET_PERIOD_SECS") {
            if let Ok(secs) = val.parse::<u64>() {
                config.watcher.quiet_period_secs = secs;
            }
        }

        if let Ok(val) = std::env::var("LULLWATCH_POLL_TIMEOUT_MS") {
            if let Ok(ms) = val.parse::<u64>() {
                config.watcher.poll_timeout_ms = ms;
            }
        }

        if let Ok(val) = std::env::var("LULLWATCH_WRITE_IGNORE_SECS") {
            if let Ok(secs) = val.parse::<u64>() {
                config.store.write_ignore_secs = secs;
            }
        }

        config
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.watcher.quiet_period_secs == 0 {
            return Err("quiet_period_secs must be greater than 0".to_string());
        }

        if self.watcher.poll_timeout_ms == 0 {
            return Err("poll_timeout_ms must be greater than 0".to_string());
        }

        if self.store.write_ignore_secs == 0 {
            return Err("write_ignore_secs must be greater than 0".to_string());
        }

        Ok(())
    }
}
