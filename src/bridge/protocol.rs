//! Frames exchanged over a bridge WebSocket connection

use crate::router::{RequestEnvelope, ResponseEnvelope};
use serde::{Deserialize, Serialize};

/// Protocol message types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ProtocolMessage {
    /// Open a port under a channel name; must be the first frame
    Connect { name: String },
    /// Request envelope sent over the port
    Request(RequestEnvelope),
    /// Response to one request
    Response(ResponseEnvelope),
    /// Unsolicited message, e.g. the `unlocked` broadcast
    Event(ResponseEnvelope),
    /// Ping/keepalive
    Ping,
    /// Pong response
    Pong,
    /// Error message
    Error {
        code: String,
        message: String,
        #[serde(rename = "requestId", default, skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
    },
}

impl ProtocolMessage {
    pub fn error(code: &str, message: impl Into<String>, request_id: Option<String>) -> Self {
        ProtocolMessage::Error {
            code: code.to_string(),
            message: message.into(),
            request_id,
        }
    }
}
