// src/storage/error.rs
//!
//! Storage Error Types
//!

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, Serialize)]
#[serde(tag = "type", content = "details")]
pub enum StorageError {
    /// The host denied access (quota, permissions, disk gone)
    #[error("Storage unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Storage file {path} is corrupted: {reason}")]
    Corrupted { path: String, reason: String },
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        StorageError::Unavailable {
            reason: e.to_string(),
        }
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Unavailable {
            reason: format!("serialization failed: {}", e),
        }
    }
}
