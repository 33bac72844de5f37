// src/storage/gateway.rs
//!
//! Storage gateway trait and change notifications
//!

use super::error::StorageError;
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tokio::sync::broadcast;

/// Flat key -> value mapping, the shape of `get_all` and of import/export files
pub type StorageMap = serde_json::Map<String, JsonValue>;

/// Capacity of the change feed; slow subscribers skip ahead instead of
/// blocking writers.
const CHANGE_FEED_CAPACITY: usize = 256;

/// A single key changed in a storage area.
///
/// `None` on either side means the key was absent before or after the change.
#[derive(Debug, Clone, PartialEq)]
pub struct StorageChange {
    pub key: String,
    pub old_value: Option<JsonValue>,
    pub new_value: Option<JsonValue>,
}

/// Storage gateway trait
///
/// All storage areas must implement this trait.
/// Implementations should be thread-safe (Send + Sync).
#[async_trait]
pub trait StorageGateway: Send + Sync {
    /// Name of the area, used in log lines
    fn area_name(&self) -> &'static str;

    /// Read a single item
    async fn get(&self, key: &str) -> Result<Option<JsonValue>, StorageError>;

    /// Read every item in the area
    async fn get_all(&self) -> Result<StorageMap, StorageError>;

    /// Write an item, replacing any previous value
    async fn set(&self, key: &str, value: JsonValue) -> Result<(), StorageError>;

    /// Delete an item; deleting a missing key is not an error
    async fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Delete every item in the area
    async fn clear(&self) -> Result<(), StorageError>;

    /// Subscribe to changes made through any handle of this area
    fn subscribe(&self) -> broadcast::Receiver<StorageChange>;
}

/// Fan-out of storage changes to every subscriber
#[derive(Debug)]
pub(crate) struct ChangeFeed {
    tx: broadcast::Sender<StorageChange>,
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeFeed {
    pub(crate) fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self { tx }
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.tx.subscribe()
    }

    pub(crate) fn publish(&self, changes: Vec<StorageChange>) {
        for change in changes {
            // No subscribers is fine
            let _ = self.tx.send(change);
        }
    }
}

/// Compute the change list a `clear` produces for the given contents
pub(crate) fn clear_changes(items: &StorageMap) -> Vec<StorageChange> {
    items
        .iter()
        .map(|(key, value)| StorageChange {
            key: key.clone(),
            old_value: Some(value.clone()),
            new_value: None,
        })
        .collect()
}
