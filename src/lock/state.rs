// src/lock/state.rs
//!
//! Lock state context: the flag, the auto-lock timer, and the ports it
//! persists and broadcasts through.
//!

use super::auto_lock::AutoLockTimer;
use super::LOCK_STATE_KEY;
use crate::host::{ExtensionHost, LockView, TabDelivery};
use crate::router::protocol::{Response, ResponseEnvelope};
use crate::storage::{StorageError, StorageGateway};
use serde_json::Value as JsonValue;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

pub struct LockState {
    is_locked: Arc<AtomicBool>,
    session: Arc<dyn StorageGateway>,
    host: Arc<dyn ExtensionHost>,
    view: Option<Arc<dyn LockView>>,
    auto_lock: AutoLockTimer,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl LockState {
    /// Lock state for a background context (no UI to navigate)
    pub fn new(
        session: Arc<dyn StorageGateway>,
        host: Arc<dyn ExtensionHost>,
        auto_lock: AutoLockTimer,
    ) -> Arc<Self> {
        Arc::new(Self {
            is_locked: Arc::new(AtomicBool::new(true)),
            session,
            host,
            view: None,
            auto_lock,
            listener: Mutex::new(None),
        })
    }

    /// Lock state for a UI context that shows a locked view on `lock()`
    pub fn with_view(
        session: Arc<dyn StorageGateway>,
        host: Arc<dyn ExtensionHost>,
        auto_lock: AutoLockTimer,
        view: Arc<dyn LockView>,
    ) -> Arc<Self> {
        Arc::new(Self {
            is_locked: Arc::new(AtomicBool::new(true)),
            session,
            host,
            view: Some(view),
            auto_lock,
            listener: Mutex::new(None),
        })
    }

    pub fn is_locked(&self) -> bool {
        self.is_locked.load(Ordering::SeqCst)
    }

    pub fn auto_lock(&self) -> &AutoLockTimer {
        &self.auto_lock
    }

    /// Close the gate. Idempotent.
    pub async fn lock(&self) -> Result<(), StorageError> {
        self.is_locked.store(true, Ordering::SeqCst);
        self.auto_lock.cancel();
        self.persist().await?;

        if let Some(view) = &self.view {
            view.show_locked();
        }

        tracing::info!("[LockState] Locked");
        Ok(())
    }

    /// Open the gate and tell every open tab about it. Idempotent.
    ///
    /// Delivery failures to individual tabs are logged and reported in the
    /// returned list, they never fail the unlock.
    pub async fn unlock(self: &Arc<Self>) -> Result<Vec<TabDelivery>, StorageError> {
        self.is_locked.store(false, Ordering::SeqCst);
        self.arm_auto_lock();
        self.persist().await?;

        tracing::info!("[LockState] Unlocked");
        Ok(self.broadcast_unlocked().await)
    }

    /// Run once at startup: follow the persisted slot from here on, then seed
    /// the in-memory flag from it. Anything but a boolean means locked.
    pub async fn load_initial_state(self: &Arc<Self>) -> Result<(), StorageError> {
        self.listen_for_changes();

        match self.session.get(LOCK_STATE_KEY).await? {
            Some(JsonValue::Bool(stored)) => {
                self.is_locked.store(stored, Ordering::SeqCst);
                if stored {
                    self.auto_lock.cancel();
                } else {
                    self.arm_auto_lock();
                }
                tracing::debug!("[LockState] Restored persisted state: locked={}", stored);
                Ok(())
            }
            Some(other) => {
                tracing::warn!(
                    "[LockState] Ignoring non-boolean persisted state {}, locking",
                    other
                );
                self.lock().await
            }
            None => self.lock().await,
        }
    }

    async fn persist(&self) -> Result<(), StorageError> {
        self.session
            .set(LOCK_STATE_KEY, JsonValue::Bool(self.is_locked()))
            .await
    }

    fn arm_auto_lock(self: &Arc<Self>) {
        let weak: Weak<Self> = Arc::downgrade(self);
        self.auto_lock.arm(move || async move {
            if let Some(state) = weak.upgrade() {
                if let Err(e) = state.lock().await {
                    tracing::error!("[AutoLock] Failed to lock: {}", e);
                }
            }
        });
    }

    async fn broadcast_unlocked(&self) -> Vec<TabDelivery> {
        let event = ResponseEnvelope::from(Response::Unlocked {
            request_id: uuid::Uuid::new_v4().to_string(),
        });
        let message = match serde_json::to_value(&event) {
            Ok(message) => message,
            Err(e) => {
                tracing::error!("[LockState] Failed to serialize unlock event: {}", e);
                return Vec::new();
            }
        };

        let tabs = match self.host.query_tabs().await {
            Ok(tabs) => tabs,
            Err(e) => {
                tracing::error!("[LockState] Error sending unlock response: {}", e);
                return Vec::new();
            }
        };

        let sends = tabs.into_iter().map(|tab_id| {
            let message = &message;
            async move {
                let outcome = self.host.send_to_tab(tab_id, message).await;
                if let Err(e) = &outcome {
                    tracing::warn!("[LockState] Unlock event not delivered: {}", e);
                }
                TabDelivery { tab_id, outcome }
            }
        });
        futures_util::future::join_all(sends).await
    }

    /// Keep the in-memory flag in step with writes made by other contexts
    fn listen_for_changes(&self) {
        let mut changes = self.session.subscribe();
        let flag = Arc::clone(&self.is_locked);

        let handle = tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(change) if change.key == LOCK_STATE_KEY => {
                        if let Some(JsonValue::Bool(stored)) = change.new_value {
                            flag.store(stored, Ordering::SeqCst);
                        }
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!("[LockState] Missed {} session changes", skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        let mut listener = self.listener.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = listener.replace(handle) {
            previous.abort();
        }
    }
}

impl Drop for LockState {
    fn drop(&mut self) {
        self.auto_lock.cancel();
        if let Ok(mut listener) = self.listener.lock() {
            if let Some(handle) = listener.take() {
                handle.abort();
            }
        }
    }
}
