//! Shared fakes for unit tests

use crate::host::{ExtensionHost, HostError, LockView, TabId};
use crate::lock::{AutoLockTimer, LockState};
use crate::router::MessageRouter;
use crate::storage::{MemoryStorage, StorageChange, StorageError, StorageGateway, StorageMap};
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;

/// Host that records what the bridge asked of it
#[derive(Default)]
pub struct RecordingHost {
    pub popups_opened: AtomicUsize,
    pub tabs: Vec<TabId>,
    pub unreachable_tabs: HashSet<TabId>,
    pub fail_tab_query: bool,
    pub delivered: Mutex<Vec<(TabId, JsonValue)>>,
}

impl RecordingHost {
    pub fn with_tabs(tabs: Vec<TabId>) -> Self {
        Self {
            tabs,
            ..Self::default()
        }
    }

    pub fn popups_opened(&self) -> usize {
        self.popups_opened.load(Ordering::SeqCst)
    }

    pub fn delivered(&self) -> Vec<(TabId, JsonValue)> {
        self.delivered.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExtensionHost for RecordingHost {
    async fn open_popup(&self) -> Result<(), HostError> {
        self.popups_opened.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn query_tabs(&self) -> Result<Vec<TabId>, HostError> {
        if self.fail_tab_query {
            return Err(HostError::TabQuery("tabs permission missing".to_string()));
        }
        Ok(self.tabs.clone())
    }

    async fn send_to_tab(&self, tab_id: TabId, message: &JsonValue) -> Result<(), HostError> {
        if self.unreachable_tabs.contains(&tab_id) {
            return Err(HostError::TabUnreachable {
                tab_id,
                reason: "no receiving end".to_string(),
            });
        }
        self.delivered.lock().unwrap().push((tab_id, message.clone()));
        Ok(())
    }
}

/// Lock view that counts navigations
#[derive(Default)]
pub struct CountingView {
    pub shown: AtomicUsize,
}

impl LockView for CountingView {
    fn show_locked(&self) {
        self.shown.fetch_add(1, Ordering::SeqCst);
    }
}

/// Wraps a storage area and counts every call that reaches it
pub struct CountingStorage {
    inner: MemoryStorage,
    calls: AtomicUsize,
}

impl CountingStorage {
    pub fn new() -> Self {
        Self {
            inner: MemoryStorage::new("local"),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn count(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl StorageGateway for CountingStorage {
    fn area_name(&self) -> &'static str {
        "local"
    }

    async fn get(&self, key: &str) -> Result<Option<JsonValue>, StorageError> {
        self.count();
        self.inner.get(key).await
    }

    async fn get_all(&self) -> Result<StorageMap, StorageError> {
        self.count();
        self.inner.get_all().await
    }

    async fn set(&self, key: &str, value: JsonValue) -> Result<(), StorageError> {
        self.count();
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.count();
        self.inner.remove(key).await
    }

    async fn clear(&self) -> Result<(), StorageError> {
        self.count();
        self.inner.clear().await
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.inner.subscribe()
    }
}

/// Storage area whose writes fail for keys starting with `deny`
pub struct DenyingStorage {
    inner: MemoryStorage,
    deny_all: bool,
}

impl DenyingStorage {
    pub fn new() -> Self {
        Self {
            inner: MemoryStorage::new("local"),
            deny_all: false,
        }
    }

    pub fn unavailable() -> Self {
        Self {
            inner: MemoryStorage::new("local"),
            deny_all: true,
        }
    }

    fn check(&self, key: &str) -> Result<(), StorageError> {
        if self.deny_all || key.starts_with("deny") {
            return Err(StorageError::Unavailable {
                reason: "QUOTA_BYTES quota exceeded".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl StorageGateway for DenyingStorage {
    fn area_name(&self) -> &'static str {
        "local"
    }

    async fn get(&self, key: &str) -> Result<Option<JsonValue>, StorageError> {
        self.check(key)?;
        self.inner.get(key).await
    }

    async fn get_all(&self) -> Result<StorageMap, StorageError> {
        self.check("")?;
        self.inner.get_all().await
    }

    async fn set(&self, key: &str, value: JsonValue) -> Result<(), StorageError> {
        self.check(key)?;
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.check(key)?;
        self.inner.remove(key).await
    }

    async fn clear(&self) -> Result<(), StorageError> {
        self.check("")?;
        self.inner.clear().await
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.inner.subscribe()
    }
}

/// Everything a router test needs, wired together
pub struct Fixture {
    pub storage: Arc<dyn StorageGateway>,
    pub session: Arc<MemoryStorage>,
    pub host: Arc<RecordingHost>,
    pub lock: Arc<LockState>,
    pub router: Arc<MessageRouter>,
}

impl Fixture {
    pub fn new(storage: Arc<dyn StorageGateway>) -> Self {
        Self::with_host(storage, RecordingHost::default())
    }

    pub fn with_host(storage: Arc<dyn StorageGateway>, host: RecordingHost) -> Self {
        let session = Arc::new(MemoryStorage::session());
        let host = Arc::new(host);
        let lock = LockState::new(session.clone(), host.clone(), AutoLockTimer::disabled());
        let router = Arc::new(MessageRouter::new(
            storage.clone(),
            session.clone(),
            lock.clone(),
            host.clone(),
        ));
        Self {
            storage,
            session,
            host,
            lock,
            router,
        }
    }

    /// Fixture over an in-memory store, already unlocked
    pub async fn unlocked() -> Self {
        let fixture = Self::new(Arc::new(MemoryStorage::new("local")));
        fixture.lock.unlock().await.unwrap();
        fixture
    }
}

/// Poll `condition` until it holds or a second passes
pub async fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
