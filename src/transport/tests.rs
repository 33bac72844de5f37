//! Tests for the transport adapters

use super::*;
use crate::test_support::Fixture;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

/// Page window with a content relay in front of the fixture's router
fn page(fixture: &Fixture) -> (PageWindow, Arc<ContentRelay>) {
    let window = PageWindow::new();
    let runtime: Arc<dyn RuntimeChannel> = Arc::new(LocalRuntime::new(fixture.router.clone()));
    let relay = ContentRelay::new(window.clone(), runtime);
    relay.spawn();
    (window, relay)
}

// ============================================================================
// Runtime channel
// ============================================================================

#[tokio::test]
async fn test_runtime_message_round_trip() {
    let fixture = Fixture::unlocked().await;
    let runtime = LocalRuntime::new(fixture.router.clone());

    let response = runtime
        .send_message(json!({
            "api": "LocalStorage:Request",
            "action": "setItem",
            "key": "a",
            "value": "1",
            "requestId": "r1",
        }))
        .await
        .unwrap();
    assert_eq!(response["action"], "setItem");
    assert_eq!(response["requestId"], "r1");
}

#[tokio::test]
async fn test_runtime_message_rejects_unknown_action() {
    let fixture = Fixture::unlocked().await;
    let runtime = LocalRuntime::new(fixture.router.clone());

    let result = runtime
        .send_message(json!({"api": "LocalStorage:Request", "action": "nope", "requestId": "r1"}))
        .await;
    assert!(matches!(result, Err(TransportError::Router(_))));
}

// ============================================================================
// Page window, relay and facade
// ============================================================================

#[tokio::test]
async fn test_window_storage_round_trip() {
    let fixture = Fixture::unlocked().await;
    let (window, _relay) = page(&fixture);
    let storage = WindowStorage::attach(window);

    storage.set_item("a", "1").await.unwrap();
    assert_eq!(storage.get_item("a").await.unwrap(), Some(json!("1")));
    assert_eq!(storage.get_item("missing").await.unwrap(), None);
    assert_eq!(storage.keys().await.unwrap(), vec!["a".to_string()]);

    storage.remove_item("a").await.unwrap();
    assert_eq!(storage.get_item("a").await.unwrap(), None);
    assert_eq!(storage.pending(), 0);
}

#[tokio::test]
async fn test_window_storage_reports_locked() {
    let fixture = Fixture::unlocked().await;
    let (window, _relay) = page(&fixture);
    let storage = WindowStorage::attach(window);

    storage.set_item("a", "1").await.unwrap();
    fixture.lock.lock().await.unwrap();

    assert_eq!(
        storage.get_item("a").await,
        Err(WindowStorageError::Locked)
    );
    assert_eq!(fixture.storage.get("a").await.unwrap(), Some(json!("1")));
}

#[tokio::test]
async fn test_window_storage_clear_requires_confirmation() {
    let fixture = Fixture::unlocked().await;
    let (window, _relay) = page(&fixture);
    let storage = WindowStorage::attach(window);

    storage.set_item("a", "1").await.unwrap();
    assert_eq!(storage.clear().await.unwrap(), ClearOutcome::Requested);
    assert_eq!(storage.keys().await.unwrap(), vec!["a".to_string()]);
    assert_eq!(fixture.host.popups_opened(), 1);
}

#[tokio::test]
async fn test_window_storage_unlock_opens_popup() {
    let fixture = Fixture::new(Arc::new(crate::storage::MemoryStorage::new("local")));
    let (window, _relay) = page(&fixture);
    let storage = WindowStorage::attach(window);

    storage.unlock().await.unwrap();
    assert_eq!(fixture.host.popups_opened(), 1);
    assert!(fixture.lock.is_locked());
}

#[tokio::test]
async fn test_window_storage_concurrent_calls() {
    let fixture = Fixture::unlocked().await;
    let (window, _relay) = page(&fixture);
    let storage = Arc::new(WindowStorage::attach(window));

    let writes = (0..20).map(|i| {
        let storage = storage.clone();
        async move { storage.set_item(&format!("k{}", i), i).await }
    });
    for result in futures::future::join_all(writes).await {
        result.unwrap();
    }

    let reads = (0..20).map(|i| {
        let storage = storage.clone();
        async move { (i, storage.get_item(&format!("k{}", i)).await) }
    });
    for (i, result) in futures::future::join_all(reads).await {
        assert_eq!(result.unwrap(), Some(json!(i)));
    }
    assert_eq!(storage.pending(), 0);
}

#[tokio::test]
async fn test_relay_ignores_foreign_messages() {
    let fixture = Fixture::unlocked().await;
    let (window, _relay) = page(&fixture);
    let mut observer = window.subscribe();

    window.post_message(json!({"type": "something-else", "requestId": "x"}));
    window.post_message(json!({"api": "LocalStorage", "action": "clear", "requestId": "legacy"}));

    // Only the two posted messages, nothing relayed back
    assert!(observer.recv().await.is_ok());
    assert!(observer.recv().await.is_ok());
    let next = tokio::time::timeout(Duration::from_millis(100), observer.recv()).await;
    assert!(next.is_err());
    assert_eq!(fixture.host.popups_opened(), 0);
}

#[tokio::test]
async fn test_relay_delivers_runtime_messages_to_page() {
    let fixture = Fixture::unlocked().await;
    let (window, relay) = page(&fixture);
    let mut observer = window.subscribe();

    relay.deliver_from_runtime(json!({"api": "Lock:Response", "action": "unlocked", "requestId": "u"}));

    let message = observer.recv().await.unwrap();
    assert_eq!(message["action"], "unlocked");
}

#[tokio::test]
async fn test_lost_response_leaves_call_pending() {
    // No relay: nobody answers
    let window = PageWindow::new();
    let storage = WindowStorage::attach(window);

    let result = tokio::time::timeout(Duration::from_millis(100), storage.get_item("a")).await;
    assert!(result.is_err());
}

// ============================================================================
// Ports
// ============================================================================

#[tokio::test]
async fn test_port_answers_each_request() {
    let fixture = Fixture::unlocked().await;
    let listener = PortListener::new(fixture.router.clone());

    let (port, mut client) = connect(LOCAL_STORAGE_CHANNEL);
    assert!(listener.on_connect(port));

    client
        .post_message(json!({"api": "LocalStorage:Request", "action": "setItem", "key": "a", "value": "1", "requestId": "p1"}))
        .unwrap();
    match client.recv().await.unwrap() {
        PortEvent::Message(response) => assert_eq!(response["requestId"], "p1"),
        other => panic!("unexpected event {:?}", other),
    }

    for i in 0..10 {
        client
            .post_message(json!({"api": "LocalStorage:Request", "action": "getItem", "key": "a", "requestId": format!("g{}", i)}))
            .unwrap();
    }
    let mut ids = Vec::new();
    for _ in 0..10 {
        match client.recv().await.unwrap() {
            PortEvent::Message(response) => {
                assert_eq!(response["result"], "1");
                ids.push(response["requestId"].as_str().unwrap().to_string());
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
    ids.sort();
    let mut expected: Vec<String> = (0..10).map(|i| format!("g{}", i)).collect();
    expected.sort();
    assert_eq!(ids, expected);
}

#[tokio::test]
async fn test_port_reports_failures() {
    let fixture = Fixture::unlocked().await;
    let listener = PortListener::new(fixture.router.clone());
    let (port, mut client) = connect(LOCAL_STORAGE_CHANNEL);
    listener.on_connect(port);

    client
        .post_message(json!({"api": "LocalStorage:Request", "action": "explode", "requestId": "bad"}))
        .unwrap();
    match client.recv().await.unwrap() {
        PortEvent::Failed {
            request_id, code, ..
        } => {
            assert_eq!(request_id.as_deref(), Some("bad"));
            assert_eq!(code, "UNKNOWN_ACTION");
        }
        other => panic!("unexpected event {:?}", other),
    }
}

#[tokio::test]
async fn test_port_with_wrong_name_is_ignored() {
    let fixture = Fixture::unlocked().await;
    let listener = PortListener::new(fixture.router.clone());

    let (port, mut client) = connect("SomeOtherChannel");
    assert!(!listener.on_connect(port));

    client
        .post_message(json!({"api": "LocalStorage:Request", "action": "keys", "requestId": "k"}))
        .unwrap();
    let next = tokio::time::timeout(Duration::from_millis(100), client.recv()).await;
    assert!(next.is_err(), "mismatched port must stay silent");
}
