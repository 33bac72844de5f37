//! Short-lived runtime messages: one message in, one response out

use super::error::TransportError;
use crate::router::MessageRouter;
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::sync::Arc;

/// Channel from a content context to the extension side
#[async_trait]
pub trait RuntimeChannel: Send + Sync {
    async fn send_message(&self, message: JsonValue) -> Result<JsonValue, TransportError>;
}

/// Runtime channel served in-process by a router
pub struct LocalRuntime {
    router: Arc<MessageRouter>,
}

impl LocalRuntime {
    pub fn new(router: Arc<MessageRouter>) -> Self {
        Self { router }
    }
}

#[async_trait]
impl RuntimeChannel for LocalRuntime {
    async fn send_message(&self, message: JsonValue) -> Result<JsonValue, TransportError> {
        Ok(self.router.handle_message(message).await?)
    }
}
