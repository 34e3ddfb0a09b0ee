//! Application configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use shield_state::DateRange;

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backend connection settings.
    pub backend: BackendConfig,
    /// Chart feed settings.
    pub charts: ChartConfig,
    /// Periodic task cadences.
    pub timers: TimerConfig,
}

/// Backend connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the dashboard backend.
    pub base_url: String,
    /// Alarms fetched per snapshot.
    pub alarm_limit: usize,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            alarm_limit: 50,
        }
    }
}

/// Chart feed settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    /// Minimum milliseconds between chart updates per series.
    pub throttle_ms: u64,
    /// Initial history window.
    pub range: DateRange,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            throttle_ms: 1000,
            range: DateRange::Day,
        }
    }
}

impl ChartConfig {
    /// Throttle as a duration.
    #[must_use]
    pub fn throttle(&self) -> Duration {
        Duration::from_millis(self.throttle_ms)
    }
}

/// Periodic task cadences, in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimerConfig {
    /// Clock tick driving the status line.
    pub clock_secs: u64,
    /// Stats aggregate refresh.
    pub stats_refresh_secs: u64,
    /// Staleness sweep re-deriving sensor health.
    pub staleness_sweep_secs: u64,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            clock_secs: 1,
            stats_refresh_secs: 5,
            staleness_sweep_secs: 30,
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the config file.
    #[error("Failed to read config from {path}: {source}")]
    Read {
        /// Offending path.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse the config file.
    #[error("Failed to parse config at {path}: {source}")]
    Parse {
        /// Offending path.
        path: PathBuf,
        /// Underlying TOML failure.
        #[source]
        source: toml::de::Error,
    },

    /// Semantic validation failed.
    #[error("Invalid configuration: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

/// Default config path, relative to the working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("shield.toml")
}

impl Config {
    /// Load configuration from the default path, falling back to defaults
    /// when the file does not exist.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = default_config_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Read {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Validate the configuration and return any errors.
    ///
    /// This checks:
    /// - The backend URL has an http(s) scheme
    /// - The alarm limit is non-zero
    /// - Every timer period is non-zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if !self.backend.base_url.starts_with("http://")
            && !self.backend.base_url.starts_with("https://")
        {
            errors.push(format!(
                "backend.base_url must start with http:// or https://, got: {}",
                self.backend.base_url
            ));
        }
        if self.backend.alarm_limit == 0 {
            errors.push("backend.alarm_limit must be > 0".to_string());
        }
        if self.timers.clock_secs == 0 {
            errors.push("timers.clock_secs must be > 0".to_string());
        }
        if self.timers.stats_refresh_secs == 0 {
            errors.push("timers.stats_refresh_secs must be > 0".to_string());
        }
        if self.timers.staleness_sweep_secs == 0 {
            errors.push("timers.staleness_sweep_secs must be > 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(errors))
        }
    }
}
