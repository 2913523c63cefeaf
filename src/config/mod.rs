//! Configuration for vispipe.
//!
//! A single TOML file with two sections:
//!
//! ```toml
//! [persistence]
//! compression_level = 6
//! pretty_json = true
//!
//! [logging]
//! filter = "info,vispipe=debug"
//! ```
//!
//! Missing keys fall back to their defaults.

use crate::error::{Result, VisError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Config file extension
pub const CONFIG_FILE_EXTENSION: &str = "toml";

/// Default gzip level for dataset payloads
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 6;

/// Default `EnvFilter` directive
pub const DEFAULT_LOG_FILTER: &str = "info,vispipe=debug";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub persistence: PersistenceConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// How pipeline state is written to disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Gzip level (0-9) for dataset payloads
    #[serde(default = "default_compression_level")]
    pub compression_level: u32,

    /// Indent pipeline files
    #[serde(default = "default_true")]
    pub pretty_json: bool,
}

fn default_compression_level() -> u32 {
    DEFAULT_COMPRESSION_LEVEL
}

fn default_true() -> bool {
    true
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            pretty_json: true,
        }
    }
}

/// Logging setup for the binary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

impl PipelineConfig {
    /// Load a config file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            VisError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| {
            VisError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file, returning defaults on any error
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save config to disk as TOML
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                VisError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| VisError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content).map_err(|e| {
            VisError::Config(format!("Failed to write config file {:?}: {}", path, e))
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.persistence.compression_level > 9 {
            return Err(VisError::Config(format!(
                "compression_level must be 0-9, got {}",
                self.persistence.compression_level
            )));
        }
        Ok(())
    }
}
