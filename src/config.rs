//! Kernel settings read from an optional TOML file.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config `{path}`: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config `{path}`: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Missing fields take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KernelConfig {
    pub cache: CacheSettings,
    pub resolve: ResolveSettings,
    pub log: LogSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheSettings {
    /// Period of the expired-entry sweep.
    pub sweep_interval_ms: u64,
    /// TTL for cache descriptors that do not set `ttl_ms`.
    pub default_ttl_ms: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            sweep_interval_ms: 60_000,
            default_ttl_ms: 300_000,
        }
    }
}

impl CacheSettings {
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    pub fn default_ttl(&self) -> Duration {
        Duration::from_millis(self.default_ttl_ms)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResolveSettings {
    /// Deadline for resolving all dependencies of one command.
    pub deadline_ms: Option<u64>,
}

impl ResolveSettings {
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_ms.map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogSettings {
    /// `EnvFilter` directives used when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            filter: "warn".to_string(),
        }
    }
}

impl KernelConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache.sweep_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "cache.sweep_interval_ms must be > 0".to_string(),
            ));
        }
        if self.cache.default_ttl_ms == 0 {
            return Err(ConfigError::Invalid(
                "cache.default_ttl_ms must be > 0".to_string(),
            ));
        }
        if self.resolve.deadline_ms == Some(0) {
            return Err(ConfigError::Invalid(
                "resolve.deadline_ms must be > 0".to_string(),
            ));
        }
        if self.log.filter.trim().is_empty() {
            return Err(ConfigError::Invalid("log.filter must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Loads and validates `path`, or the defaults when no path is given.
pub fn load_config(path: Option<&Path>) -> Result<KernelConfig, ConfigError> {
    let config = match path {
        Some(path) => {
            let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.display().to_string(),
                source,
            })?;
            toml::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.display().to_string(),
                source,
            })?
        }
        None => KernelConfig::default(),
    };
    config.validate()?;
    Ok(config)
}
