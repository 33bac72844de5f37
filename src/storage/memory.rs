// src/storage/memory.rs
//!
//! In-memory storage area. Used for the session area, which must not outlive
//! the process, and as a stand-in for the persistent area in tests.
//!

use super::error::StorageError;
use super::gateway::{clear_changes, ChangeFeed, StorageChange, StorageGateway, StorageMap};
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tokio::sync::{broadcast, RwLock};

#[derive(Debug)]
pub struct MemoryStorage {
    area: &'static str,
    items: RwLock<StorageMap>,
    changes: ChangeFeed,
}

impl MemoryStorage {
    pub fn new(area: &'static str) -> Self {
        Self {
            area,
            items: RwLock::new(StorageMap::new()),
            changes: ChangeFeed::new(),
        }
    }

    /// Session area used for the lock flag and popup redirect intent
    pub fn session() -> Self {
        Self::new("session")
    }
}

#[async_trait]
impl StorageGateway for MemoryStorage {
    fn area_name(&self) -> &'static str {
        self.area
    }

    async fn get(&self, key: &str) -> Result<Option<JsonValue>, StorageError> {
        let items = self.items.read().await;
        Ok(items.get(key).cloned())
    }

    async fn get_all(&self) -> Result<StorageMap, StorageError> {
        let items = self.items.read().await;
        Ok(items.clone())
    }

    async fn set(&self, key: &str, value: JsonValue) -> Result<(), StorageError> {
        let old_value = {
            let mut items = self.items.write().await;
            items.insert(key.to_string(), value.clone())
        };
        self.changes.publish(vec![StorageChange {
            key: key.to_string(),
            old_value,
            new_value: Some(value),
        }]);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let old_value = {
            let mut items = self.items.write().await;
            items.remove(key)
        };
        if old_value.is_some() {
            self.changes.publish(vec![StorageChange {
                key: key.to_string(),
                old_value,
                new_value: None,
            }]);
        }
        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        let removed = {
            let mut items = self.items.write().await;
            std::mem::take(&mut *items)
        };
        self.changes.publish(clear_changes(&removed));
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.changes.subscribe()
    }
}
