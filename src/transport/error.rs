//! Error types for transports

use crate::router::RouterError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Request failed: {0}")]
    Router(#[from] RouterError),

    #[error("Channel {0} disconnected")]
    Disconnected(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors seen by page code using the `WindowStorage` facade
#[derive(Error, Debug, PartialEq, Eq)]
pub enum WindowStorageError {
    /// The bridge is locked; unlock through the popup first
    #[error("Storage is locked")]
    Locked,

    #[error("Page window closed before a response arrived")]
    Closed,

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}
