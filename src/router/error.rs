//! Error types for the message router

use crate::host::HostError;
use crate::storage::StorageError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RouterError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Don't know how to handle {api} action: {action}")]
    UnknownAction { api: String, action: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Host error: {0}")]
    Host(#[from] HostError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RouterError {
    /// Stable code used in wire error frames
    pub fn code(&self) -> &'static str {
        match self {
            RouterError::Storage(_) => "STORAGE_UNAVAILABLE",
            RouterError::UnknownAction { .. } => "UNKNOWN_ACTION",
            RouterError::InvalidRequest(_) => "INVALID_REQUEST",
            RouterError::Host(_) => "HOST_ERROR",
            RouterError::Json(_) => "SERIALIZATION_ERROR",
        }
    }
}
