// src/popup/error.rs

use crate::storage::StorageError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, Serialize)]
#[serde(tag = "type", content = "details")]
pub enum PopupError {
    #[error("Storage is locked")]
    Locked,

    #[error("No clear request is pending")]
    NothingPending,

    #[error("Import must be a JSON object: {reason}")]
    InvalidImport { reason: String },

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("IO error at {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("JSON error: {reason}")]
    Json { reason: String },
}

impl From<serde_json::Error> for PopupError {
    fn from(e: serde_json::Error) -> Self {
        PopupError::Json {
            reason: e.to_string(),
        }
    }
}
