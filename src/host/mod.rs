//! Host ports
//!
//! Primitives the bridge needs from whatever hosts it: opening the popup for a
//! human decision, reaching every open tab, and moving a UI context to its
//! locked view. They are injected into the lock state and router so both can
//! run without a real browser behind them.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use thiserror::Error;

/// Identifier of an open tab (or any other broadcast target)
pub type TabId = u64;

#[derive(Error, Debug)]
pub enum HostError {
    #[error("Popup could not be opened: {0}")]
    Popup(String),

    #[error("Tab {tab_id} unreachable: {reason}")]
    TabUnreachable { tab_id: TabId, reason: String },

    #[error("Tab query failed: {0}")]
    TabQuery(String),
}

/// Browser-provided primitives used by the router and the lock state
#[async_trait]
pub trait ExtensionHost: Send + Sync {
    /// Surface the popup so a human can unlock or confirm a destructive action
    async fn open_popup(&self) -> Result<(), HostError>;

    /// All tabs that may be listening for bridge events
    async fn query_tabs(&self) -> Result<Vec<TabId>, HostError>;

    /// Deliver a message to a single tab
    async fn send_to_tab(&self, tab_id: TabId, message: &JsonValue) -> Result<(), HostError>;
}

/// A UI-capable context (the popup) that shows a locked view after `lock()`.
/// Background contexts have none.
pub trait LockView: Send + Sync {
    fn show_locked(&self);
}

/// Result of delivering a broadcast to one tab
#[derive(Debug)]
pub struct TabDelivery {
    pub tab_id: TabId,
    pub outcome: Result<(), HostError>,
}

impl TabDelivery {
    pub fn is_delivered(&self) -> bool {
        self.outcome.is_ok()
    }
}
