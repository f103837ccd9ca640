//! # Warden Config - Configuration Management
//!
//! Handles configuration loading from files and environment variables.

pub mod logging;

use std::path::Path;

use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
    /// Scope namespacing cache and assignment data, when multi-tenant.
    #[serde(default)]
    pub scope: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_backend")]
    pub backend: String,

    pub connection_string: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { backend: default_backend(), connection_string: None }
    }
}

fn default_backend() -> String {
    "memory".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,

    #[serde(default = "default_cache_max_capacity")]
    pub max_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { enabled: default_cache_enabled(), max_capacity: default_cache_max_capacity() }
    }
}

fn default_cache_enabled() -> bool {
    true
}

fn default_cache_max_capacity() -> u64 {
    10_000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self { log_level: default_log_level() }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.store.backend.as_str() {
            "memory" => Ok(()),
            other => Err(ConfigError::Message(format!("unknown store backend: {other}"))),
        }
    }
}

/// Load configuration from an optional file, with `WARDEN`-prefixed
/// environment overrides (e.g. `WARDEN_CACHE__ENABLED=false`).
pub fn load<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let builder = ConfigBuilder::builder()
        .add_source(File::from(path.as_ref()).required(false))
        .add_source(Environment::with_prefix("WARDEN").separator("__"))
        .build()?;

    builder.try_deserialize()
}

/// Load configuration with defaults on any failure.
pub fn load_or_default<P: AsRef<Path>>(path: P) -> Config {
    load(path).unwrap_or_default()
}
