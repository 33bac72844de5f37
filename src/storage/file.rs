// src/storage/file.rs
//!
//! JSON-file backed persistent storage area
//!
//! The whole area is held in memory and rewritten on every mutation. Writes go
//! to a temporary file in the same directory which is then renamed over the
//! target, so a crash never leaves a half-written store behind.
//!

use super::error::StorageError;
use super::gateway::{clear_changes, ChangeFeed, StorageChange, StorageGateway, StorageMap};
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::sync::{broadcast, RwLock};

#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    items: RwLock<StorageMap>,
    changes: ChangeFeed,
}

impl FileStorage {
    /// Open the store at `path`. A missing file is an empty store.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();

        let items = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => StorageMap::new(),
            Ok(bytes) => parse_store(&path, &bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StorageMap::new(),
            Err(e) => return Err(e.into()),
        };

        tracing::debug!(
            "[FileStorage] Opened {} with {} items",
            path.display(),
            items.len()
        );

        Ok(Self {
            path,
            items: RwLock::new(items),
            changes: ChangeFeed::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist a snapshot of the area. Called with the write lock held so
    /// writes land on disk in the same order they were applied.
    ///
    /// Every call rewrites and fsyncs the whole file, so N single-key writes
    /// cost O(N^2) bytes. Fine for the small stores this backs; a bulk import
    /// of a large store pays for it.
    async fn persist(&self, snapshot: &StorageMap) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec_pretty(snapshot)?;
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || write_atomically(&path, &bytes))
            .await
            .map_err(|e| StorageError::Unavailable {
                reason: format!("write task failed: {}", e),
            })?
    }
}

fn parse_store(path: &Path, bytes: &[u8]) -> Result<StorageMap, StorageError> {
    let corrupted = |reason: String| StorageError::Corrupted {
        path: path.display().to_string(),
        reason,
    };

    match serde_json::from_slice::<JsonValue>(bytes) {
        Ok(JsonValue::Object(map)) => Ok(map),
        Ok(other) => Err(corrupted(format!(
            "expected a JSON object, found {}",
            json_kind(&other)
        ))),
        Err(e) => Err(corrupted(e.to_string())),
    }
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}

fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| StorageError::Unavailable {
        reason: format!("failed to replace {}: {}", path.display(), e.error),
    })?;
    Ok(())
}

#[async_trait]
impl StorageGateway for FileStorage {
    fn area_name(&self) -> &'static str {
        "local"
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
        let mut items = self.items.write().await;
        let mut next = items.clone();
        let old_value = next.insert(key.to_string(), value.clone());

        // Only commit to memory once the file reflects the change
        self.persist(&next).await?;
        *items = next;
        drop(items);

        self.changes.publish(vec![StorageChange {
            key: key.to_string(),
            old_value,
            new_value: Some(value),
        }]);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut items = self.items.write().await;
        if !items.contains_key(key) {
            return Ok(());
        }
        let mut next = items.clone();
        let old_value = next.remove(key);

        self.persist(&next).await?;
        *items = next;
        drop(items);

        self.changes.publish(vec![StorageChange {
            key: key.to_string(),
            old_value,
            new_value: None,
        }]);
        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        let mut items = self.items.write().await;
        self.persist(&StorageMap::new()).await?;
        let removed = std::mem::take(&mut *items);
        drop(items);

        self.changes.publish(clear_changes(&removed));
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.changes.subscribe()
    }
}
