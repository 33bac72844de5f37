//! Page window messaging surface
//!
//! Every listener sees every posted message, including its own, the way
//! `window.postMessage` behaves inside a page.

use serde_json::Value as JsonValue;
use tokio::sync::broadcast;

const WINDOW_CAPACITY: usize = 1024;

#[derive(Debug, Clone)]
pub struct PageWindow {
    tx: broadcast::Sender<JsonValue>,
}

impl Default for PageWindow {
    fn default() -> Self {
        Self::new()
    }
}

impl PageWindow {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(WINDOW_CAPACITY);
        Self { tx }
    }

    /// Post a message to every listener. Posting with nobody listening is a
    /// no-op, as in a page.
    pub fn post_message(&self, message: JsonValue) {
        let _ = self.tx.send(message);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JsonValue> {
        self.tx.subscribe()
    }
}
