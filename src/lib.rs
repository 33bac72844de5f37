//! Lock-gated key-value storage bridge
//!
//! Untrusted pages and external clients reach a persistent key-value store
//! only through the [`router::MessageRouter`], which answers `locked` to
//! everything but unlock requests until the popup unlocks it.

pub mod bridge;
pub mod config;
pub mod console;
pub mod error;
pub mod host;
pub mod lock;
pub mod logging;
pub mod popup;
pub mod router;
pub mod storage;
pub mod transport;

#[cfg(test)]
mod test_support;

use crate::bridge::{BridgeHost, BridgeServer, ClientRegistry};
use crate::config::BridgeConfig;
use crate::error::AppError;
use crate::host::LockView;
use crate::lock::{AutoLockTimer, LockState};
use crate::popup::PopupController;
use crate::router::MessageRouter;
use crate::storage::{FileStorage, MemoryStorage};
use std::net::SocketAddr;
use std::sync::Arc;

pub struct AppState {
    pub config: BridgeConfig,
    pub router: Arc<MessageRouter>,
    pub lock: Arc<LockState>,
    pub popup: PopupController,
    pub host: Arc<BridgeHost>,
    /// WebSocket bridge for external clients
    pub bridge: tokio::sync::Mutex<BridgeServer>,
}

impl AppState {
    /// Wire storage, lock, router and bridge together from configuration
    pub async fn build(config: BridgeConfig, view: Arc<dyn LockView>) -> Result<Self, AppError> {
        let storage = Arc::new(FileStorage::open(&config.storage_path).await?);
        let session = Arc::new(MemoryStorage::session());

        let clients = Arc::new(ClientRegistry::new());
        let host = Arc::new(BridgeHost::new(clients.clone()));

        let auto_lock = AutoLockTimer::new(config.auto_lock.enabled, config.auto_lock.duration());
        let lock = LockState::with_view(session.clone(), host.clone(), auto_lock, view);
        lock.load_initial_state().await?;

        let router = Arc::new(
            MessageRouter::new(storage, session, lock.clone(), host.clone())
                .with_clear_policy(config.clear_policy),
        );

        tracing::info!(
            "[App] Storage at {}, clear policy {:?}, auto-lock {}",
            config.storage_path.display(),
            config.clear_policy,
            if config.auto_lock.enabled { "on" } else { "off" }
        );

        Ok(Self {
            popup: PopupController::new(router.clone()),
            bridge: tokio::sync::Mutex::new(BridgeServer::new(router.clone(), clients)),
            config,
            router,
            lock,
            host,
        })
    }

    /// Start the WebSocket bridge on the configured port
    pub async fn start_bridge(&self) -> Result<SocketAddr, AppError> {
        let mut bridge = self.bridge.lock().await;
        Ok(bridge.start(Some(self.config.port)).await?)
    }

    /// Stop the bridge if it is running and lock the store
    pub async fn shutdown(&self) -> Result<(), AppError> {
        let mut bridge = self.bridge.lock().await;
        if bridge.is_running() {
            bridge.stop().await?;
        }
        self.lock.lock().await?;
        Ok(())
    }
}
