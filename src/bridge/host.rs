//! Host ports for a headless bridge process
//!
//! Tabs are the connected WebSocket clients. There is no popup window to
//! open, so a popup request is logged and signalled to whoever drives the
//! popup commands (the console in the binary).

use super::protocol::ProtocolMessage;
use super::registry::ClientRegistry;
use crate::host::{ExtensionHost, HostError, TabId};
use crate::router::ResponseEnvelope;
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tokio::sync::Notify;

pub struct BridgeHost {
    clients: Arc<ClientRegistry>,
    popup_requested: Arc<Notify>,
}

impl BridgeHost {
    pub fn new(clients: Arc<ClientRegistry>) -> Self {
        Self {
            clients,
            popup_requested: Arc::new(Notify::new()),
        }
    }

    /// Signalled every time a request needs a human in the popup
    pub fn popup_requested(&self) -> Arc<Notify> {
        Arc::clone(&self.popup_requested)
    }
}

#[async_trait]
impl ExtensionHost for BridgeHost {
    async fn open_popup(&self) -> Result<(), HostError> {
        tracing::warn!("[BridgeHost] User interaction required in the popup");
        self.popup_requested.notify_one();
        Ok(())
    }

    async fn query_tabs(&self) -> Result<Vec<TabId>, HostError> {
        Ok(self.clients.tab_ids().await)
    }

    async fn send_to_tab(&self, tab_id: TabId, message: &JsonValue) -> Result<(), HostError> {
        let envelope: ResponseEnvelope =
            serde_json::from_value(message.clone()).map_err(|e| HostError::TabUnreachable {
                tab_id,
                reason: format!("not an envelope: {}", e),
            })?;
        self.clients
            .send(tab_id, &ProtocolMessage::Event(envelope))
            .await
    }
}
