use std::path::Path;

use serde::{Deserialize, Serialize};

/// System-wide configuration for an impend deployment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ImpendConfig {
    /// Blob storage settings
    pub storage: StorageConfig,
    /// Sync behavior settings
    pub sync: SyncConfig,
}

/// Blob storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Bucket holding image attachments
    pub bucket: String,
    /// Cache-control lifetime handed to the blob store, in seconds
    pub cache_control_secs: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: "my-todo".into(),
            cache_control_secs: 3600,
        }
    }
}

/// Sync behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Capacity of the change-feed channel between store and reconciler
    pub feed_buffer: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self { feed_buffer: 64 }
    }
}

impl ImpendConfig {
    /// Load configuration from a TOML file. Missing fields fall back to
    /// defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.display().to_string(), e.to_string()))?;
        toml::from_str(&raw).map_err(|e| ConfigError::Parse(path.display().to_string(), e.to_string()))
    }
}

/// Errors loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {0}: {1}")]
    Io(String, String),

    #[error("failed to parse config {0}: {1}")]
    Parse(String, String),
}
