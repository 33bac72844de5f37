//! Page-side `windowStorage` facade
//!
//! Each call gets a random correlation id and a one-shot waiter keyed on it,
//! then posts its request into the page window and resolves when a response
//! with the same id shows up. There is no timeout: if the response is lost
//! the call never completes.

use super::error::WindowStorageError;
use super::window::PageWindow;
use crate::router::{Request, RequestEnvelope, Response, ResponseEnvelope};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

type Waiters = Arc<Mutex<HashMap<String, oneshot::Sender<Response>>>>;

/// How a `clear` call was handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearOutcome {
    /// The store is empty now
    Cleared,
    /// The popup asks a human to confirm first
    Requested,
}

pub struct WindowStorage {
    window: PageWindow,
    waiters: Waiters,
    listener: JoinHandle<()>,
}

impl WindowStorage {
    /// Attach to a page window and start matching responses to calls
    pub fn attach(window: PageWindow) -> Self {
        let waiters: Waiters = Arc::new(Mutex::new(HashMap::new()));
        let mut messages = window.subscribe();
        let pending = Arc::clone(&waiters);

        let listener = tokio::spawn(async move {
            loop {
                let message = match messages.recv().await {
                    Ok(message) => message,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!("[WindowStorage] Missed {} page messages", skipped);
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };

                // Requests (including our own) and foreign messages don't parse
                let Ok(envelope) = serde_json::from_value::<ResponseEnvelope>(message) else {
                    continue;
                };
                let waiter = lock_waiters(&pending).remove(&envelope.request_id);
                let Some(waiter) = waiter else {
                    // Broadcast events and responses nobody waits for anymore
                    continue;
                };
                match Response::try_from(envelope) {
                    Ok(response) => {
                        let _ = waiter.send(response);
                    }
                    Err(e) => tracing::warn!("[WindowStorage] Unreadable response: {}", e),
                }
            }
        });

        Self {
            window,
            waiters,
            listener,
        }
    }

    pub async fn get_item(&self, key: &str) -> Result<Option<JsonValue>, WindowStorageError> {
        let response = self
            .call(|request_id| Request::GetItem {
                request_id,
                key: key.to_string(),
            })
            .await?;
        match response {
            Response::GetItem {
                result: JsonValue::Null,
                ..
            } => Ok(None),
            Response::GetItem { result, .. } => Ok(Some(result)),
            other => Err(unexpected(other)),
        }
    }

    pub async fn set_item(
        &self,
        key: &str,
        value: impl Into<JsonValue>,
    ) -> Result<(), WindowStorageError> {
        let value = value.into();
        match self
            .call(|request_id| Request::SetItem {
                request_id,
                key: key.to_string(),
                value,
            })
            .await?
        {
            Response::SetItem { .. } => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    pub async fn remove_item(&self, key: &str) -> Result<(), WindowStorageError> {
        match self
            .call(|request_id| Request::RemoveItem {
                request_id,
                key: key.to_string(),
            })
            .await?
        {
            Response::RemoveItem { .. } => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    pub async fn clear(&self) -> Result<ClearOutcome, WindowStorageError> {
        match self.call(|request_id| Request::Clear { request_id }).await? {
            Response::Clear { .. } => Ok(ClearOutcome::Cleared),
            Response::ClearRequested { .. } => Ok(ClearOutcome::Requested),
            other => Err(unexpected(other)),
        }
    }

    pub async fn keys(&self) -> Result<Vec<String>, WindowStorageError> {
        match self.call(|request_id| Request::Keys { request_id }).await? {
            Response::Keys { result, .. } => Ok(result),
            other => Err(unexpected(other)),
        }
    }

    /// Ask the extension to open the popup so the user can unlock
    pub async fn unlock(&self) -> Result<(), WindowStorageError> {
        match self.call(|request_id| Request::Unlock { request_id }).await? {
            Response::UnlockRequested { .. } => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    /// Number of calls still waiting for their response
    pub fn pending(&self) -> usize {
        lock_waiters(&self.waiters).len()
    }

    async fn call(
        &self,
        build: impl FnOnce(String) -> Request,
    ) -> Result<Response, WindowStorageError> {
        let request_id = uuid::Uuid::new_v4().simple().to_string();
        let (tx, rx) = oneshot::channel();

        // Register before posting so the response cannot slip past
        lock_waiters(&self.waiters).insert(request_id.clone(), tx);

        let envelope = RequestEnvelope::from(build(request_id.clone()));
        let message = match serde_json::to_value(&envelope) {
            Ok(message) => message,
            Err(e) => {
                lock_waiters(&self.waiters).remove(&request_id);
                return Err(WindowStorageError::UnexpectedResponse(e.to_string()));
            }
        };
        self.window.post_message(message);

        match rx.await {
            Ok(Response::Locked { .. }) => Err(WindowStorageError::Locked),
            Ok(response) => Ok(response),
            Err(_) => Err(WindowStorageError::Closed),
        }
    }
}

impl Drop for WindowStorage {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

fn lock_waiters(
    waiters: &Mutex<HashMap<String, oneshot::Sender<Response>>>,
) -> MutexGuard<'_, HashMap<String, oneshot::Sender<Response>>> {
    waiters.lock().unwrap_or_else(PoisonError::into_inner)
}

fn unexpected(response: Response) -> WindowStorageError {
    WindowStorageError::UnexpectedResponse(format!(
        "{} for {}",
        response.action(),
        response.request_id()
    ))
}
