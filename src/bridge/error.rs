//! Error types for the bridge server

use thiserror::Error;
use tokio::sync::mpsc::error::SendError;
use tokio_tungstenite::tungstenite::Message;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Channel send error: {0}")]
    ChannelSend(#[from] SendError<Message>),

    #[error("Server not running")]
    NotRunning,

    #[error("Server already running")]
    AlreadyRunning,
}
