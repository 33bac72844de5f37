// src/config.rs
//!
//! Bridge configuration
//!
//! Read from a JSON file with camelCase keys. Every key is optional; a
//! missing file means all defaults.

use crate::bridge::DEFAULT_BRIDGE_PORT;
use crate::lock::AUTO_LOCK_DURATION;
use crate::router::ClearPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "storage-bridge.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AutoLockConfig {
    pub enabled: bool,
    pub duration_secs: u64,
}

impl Default for AutoLockConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            duration_secs: AUTO_LOCK_DURATION.as_secs(),
        }
    }
}

impl AutoLockConfig {
    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BridgeConfig {
    /// WebSocket port on 127.0.0.1
    pub port: u16,
    /// JSON file backing the persistent store
    pub storage_path: PathBuf,
    /// Where `export` writes its files
    pub export_dir: PathBuf,
    pub auto_lock: AutoLockConfig,
    pub clear_policy: ClearPolicy,
    /// Default `tracing` filter, overridden by `RUST_LOG`
    pub log_filter: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_BRIDGE_PORT,
            storage_path: PathBuf::from("storage.json"),
            export_dir: PathBuf::from("."),
            auto_lock: AutoLockConfig::default(),
            clear_policy: ClearPolicy::default(),
            log_filter: "info".to_string(),
        }
    }
}

impl BridgeConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.display().to_string(),
                    source,
                })
            }
        };

        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }
}
