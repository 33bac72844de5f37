//! Content relay between the page window and the runtime channel
//!
//! Store-and-forward only: request envelopes posted in the page go to the
//! runtime unmodified and the response is posted back to the page. Messages
//! arriving from the runtime (the `unlocked` broadcast) are posted as-is.

use super::runtime::RuntimeChannel;
use super::window::PageWindow;
use crate::router::RequestApi;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

pub struct ContentRelay {
    window: PageWindow,
    runtime: Arc<dyn RuntimeChannel>,
}

impl ContentRelay {
    pub fn new(window: PageWindow, runtime: Arc<dyn RuntimeChannel>) -> Arc<Self> {
        Arc::new(Self { window, runtime })
    }

    /// Start listening on the page window
    pub fn spawn(self: &Arc<Self>) -> JoinHandle<()> {
        let mut messages = self.window.subscribe();
        let relay = Arc::clone(self);

        tokio::spawn(async move {
            loop {
                match messages.recv().await {
                    Ok(message) if is_request(&message) => {
                        let relay = Arc::clone(&relay);
                        tokio::spawn(async move { relay.forward(message).await });
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!("[ContentRelay] Dropped {} page messages", skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            tracing::debug!("[ContentRelay] Page window closed");
        })
    }

    /// Forward one page message and post the response back into the page
    pub async fn forward(&self, message: JsonValue) {
        match self.runtime.send_message(message).await {
            Ok(response) => self.window.post_message(response),
            Err(e) => tracing::error!("[ContentRelay] Request failed: {}", e),
        }
    }

    /// Runtime -> page direction
    pub fn deliver_from_runtime(&self, message: JsonValue) {
        self.window.post_message(message);
    }
}

/// Only envelopes of a known request family cross the relay
fn is_request(message: &JsonValue) -> bool {
    message
        .get("api")
        .and_then(JsonValue::as_str)
        .is_some_and(|api| {
            api == RequestApi::LocalStorage.as_str() || api == RequestApi::Lock.as_str()
        })
}
