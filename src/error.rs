// src/error.rs

use crate::bridge::BridgeError;
use crate::config::ConfigError;
use crate::storage::StorageError;
use thiserror::Error;

/// Startup and shutdown failures of the bridge process
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to open storage: {0}")]
    Storage(#[from] StorageError),

    #[error("Bridge server error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
