//! Connected clients, addressable as tabs

use super::protocol::ProtocolMessage;
use crate::host::{HostError, TabId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{mpsc, RwLock};
use tokio_tungstenite::tungstenite::Message;

#[derive(Debug, Default)]
pub struct ClientRegistry {
    clients: RwLock<HashMap<TabId, mpsc::UnboundedSender<Message>>>,
    next_id: AtomicU64,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection's outgoing queue and hand out its tab id
    pub async fn register(&self, tx: mpsc::UnboundedSender<Message>) -> TabId {
        let tab_id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.clients.write().await.insert(tab_id, tx);
        tab_id
    }

    pub async fn unregister(&self, tab_id: TabId) {
        self.clients.write().await.remove(&tab_id);
    }

    pub async fn tab_ids(&self) -> Vec<TabId> {
        let mut ids: Vec<TabId> = self.clients.read().await.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub async fn len(&self) -> usize {
        self.clients.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.clients.read().await.is_empty()
    }

    /// Queue a frame for one client
    pub async fn send(&self, tab_id: TabId, frame: &ProtocolMessage) -> Result<(), HostError> {
        let json = serde_json::to_string(frame).map_err(|e| HostError::TabUnreachable {
            tab_id,
            reason: e.to_string(),
        })?;

        let clients = self.clients.read().await;
        let tx = clients.get(&tab_id).ok_or_else(|| HostError::TabUnreachable {
            tab_id,
            reason: "not connected".to_string(),
        })?;
        tx.send(Message::Text(json.into()))
            .map_err(|_| HostError::TabUnreachable {
                tab_id,
                reason: "connection closed".to_string(),
            })
    }

    /// Drop every client; their writers stop once the queues close
    pub async fn clear(&self) {
        self.clients.write().await.clear();
    }
}
