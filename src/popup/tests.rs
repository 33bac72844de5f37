//! Tests for popup commands

#[cfg(test)]
mod tests {
    use super::super::commands::export_file_name;
    use super::super::*;
    use crate::router::{PopupRoute, Request, Response, REDIRECT_KEY};
    use crate::storage::{MemoryStorage, StorageGateway};
    use crate::test_support::{DenyingStorage, Fixture};
    use serde_json::json;
    use std::sync::Arc;
    use time::OffsetDateTime;

    async fn request_clear(fixture: &Fixture) {
        let response = fixture
            .router
            .dispatch(Request::Clear {
                request_id: "c".to_string(),
            })
            .await
            .unwrap();
        assert!(matches!(response, Response::ClearRequested { .. }));
    }

    // ========================================================================
    // Lock commands
    // ========================================================================

    #[tokio::test]
    async fn test_unlock_and_lock() {
        let fixture = Fixture::new(Arc::new(MemoryStorage::new("local")));
        let popup = PopupController::new(fixture.router.clone());
        assert!(popup.is_locked());

        popup.unlock().await.unwrap();
        assert!(!popup.is_locked());
        assert_eq!(
            fixture.session.get("lock:isLocked").await.unwrap(),
            Some(json!(false))
        );

        popup.lock().await.unwrap();
        assert!(popup.is_locked());
    }

    // ========================================================================
    // Clear confirmation
    // ========================================================================

    #[tokio::test]
    async fn test_confirm_clear_clears_only_after_confirmation() {
        let fixture = Fixture::unlocked().await;
        let popup = PopupController::new(fixture.router.clone());
        fixture.storage.set("a", json!("1")).await.unwrap();

        request_clear(&fixture).await;
        assert_eq!(popup.pending_route().await.unwrap(), Some(PopupRoute::Clear));
        assert_eq!(fixture.storage.get("a").await.unwrap(), Some(json!("1")));

        popup.confirm_clear().await.unwrap();
        assert!(fixture.storage.get_all().await.unwrap().is_empty());
        assert_eq!(popup.pending_route().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_confirm_clear_without_request() {
        let fixture = Fixture::unlocked().await;
        let popup = PopupController::new(fixture.router.clone());

        assert!(matches!(
            popup.confirm_clear().await,
            Err(PopupError::NothingPending)
        ));
    }

    #[tokio::test]
    async fn test_confirm_clear_refused_while_locked() {
        let fixture = Fixture::unlocked().await;
        let popup = PopupController::new(fixture.router.clone());
        fixture.storage.set("a", json!("1")).await.unwrap();
        request_clear(&fixture).await;

        popup.lock().await.unwrap();
        assert!(matches!(popup.confirm_clear().await, Err(PopupError::Locked)));
        assert_eq!(fixture.storage.get("a").await.unwrap(), Some(json!("1")));
    }

    #[tokio::test]
    async fn test_dismiss_clear_keeps_data() {
        let fixture = Fixture::unlocked().await;
        let popup = PopupController::new(fixture.router.clone());
        fixture.storage.set("a", json!("1")).await.unwrap();
        request_clear(&fixture).await;

        popup.dismiss_clear().await.unwrap();
        assert_eq!(popup.pending_route().await.unwrap(), None);
        assert_eq!(fixture.storage.get("a").await.unwrap(), Some(json!("1")));
        assert!(matches!(
            popup.confirm_clear().await,
            Err(PopupError::NothingPending)
        ));
    }

    #[tokio::test]
    async fn test_unknown_redirect_intent_is_ignored() {
        let fixture = Fixture::unlocked().await;
        let popup = PopupController::new(fixture.router.clone());
        fixture
            .session
            .set(REDIRECT_KEY, json!("settings"))
            .await
            .unwrap();

        assert_eq!(popup.pending_route().await.unwrap(), None);
    }

    // ========================================================================
    // Import
    // ========================================================================

    #[tokio::test]
    async fn test_import_sets_every_entry() {
        let fixture = Fixture::unlocked().await;
        let popup = PopupController::new(fixture.router.clone());

        let report = popup
            .import_json(r#"{"a": "1", "b": {"nested": [1, 2]}, "c": null}"#)
            .await
            .unwrap();
        assert_eq!(report, ImportReport { imported: 3, failed: 0 });
        assert_eq!(report.notice().level, NoticeLevel::Success);
        assert_eq!(
            fixture.storage.get("b").await.unwrap(),
            Some(json!({"nested": [1, 2]}))
        );
    }

    #[tokio::test]
    async fn test_import_keeps_going_past_failures() {
        let storage = Arc::new(DenyingStorage::new());
        let fixture = Fixture::new(storage.clone());
        fixture.lock.unlock().await.unwrap();
        let popup = PopupController::new(fixture.router.clone());

        let report = popup
            .import_json(r#"{"deny-1": 1, "ok-1": 2, "deny-2": 3, "ok-2": 4}"#)
            .await
            .unwrap();
        assert_eq!(report, ImportReport { imported: 2, failed: 2 });
        assert_eq!(report.notice().level, NoticeLevel::Warning);
        assert_eq!(fixture.storage.get("ok-2").await.unwrap(), Some(json!(4)));
    }

    #[tokio::test]
    async fn test_import_rejects_non_object() {
        let fixture = Fixture::unlocked().await;
        let popup = PopupController::new(fixture.router.clone());

        assert!(matches!(
            popup.import_json("[1, 2]").await,
            Err(PopupError::InvalidImport { .. })
        ));
        assert!(matches!(
            popup.import_json("{not json").await,
            Err(PopupError::InvalidImport { .. })
        ));
        assert!(fixture.storage.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_import_refused_while_locked() {
        let fixture = Fixture::new(Arc::new(MemoryStorage::new("local")));
        let popup = PopupController::new(fixture.router.clone());

        assert!(matches!(
            popup.import_json(r#"{"a": 1}"#).await,
            Err(PopupError::Locked)
        ));
    }

    #[test]
    fn test_import_notice_levels() {
        assert_eq!(
            ImportReport { imported: 0, failed: 3 }.notice().level,
            NoticeLevel::Error
        );
        assert_eq!(
            ImportReport { imported: 0, failed: 0 }.notice().level,
            NoticeLevel::Warning
        );
    }

    // ========================================================================
    // Export
    // ========================================================================

    #[test]
    fn test_export_file_name() {
        let at = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        assert_eq!(
            export_file_name(at).unwrap(),
            "storage-export-2023-11-14T22-13-20Z.json"
        );
    }

    #[tokio::test]
    async fn test_export_writes_pretty_json() {
        let fixture = Fixture::unlocked().await;
        let popup = PopupController::new(fixture.router.clone());
        fixture.storage.set("a", json!("1")).await.unwrap();
        fixture.storage.set("b", json!(2)).await.unwrap();

        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("exports");
        let at = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let report = popup.export_at(&target, at).await.unwrap();

        assert_eq!(report.entries, 2);
        assert_eq!(
            report.path,
            target.join("storage-export-2023-11-14T22-13-20Z.json")
        );
        let content = std::fs::read_to_string(&report.path).unwrap();
        assert_eq!(content, "{\n  \"a\": \"1\",\n  \"b\": 2\n}");
        assert_eq!(report.notice().level, NoticeLevel::Success);
    }

    #[tokio::test]
    async fn test_export_refused_while_locked() {
        let fixture = Fixture::new(Arc::new(MemoryStorage::new("local")));
        let popup = PopupController::new(fixture.router.clone());
        let dir = tempfile::tempdir().unwrap();

        assert!(matches!(
            popup.export_to(dir.path()).await,
            Err(PopupError::Locked)
        ));
    }

    #[tokio::test]
    async fn test_export_storage_failure() {
        let fixture = Fixture::new(Arc::new(DenyingStorage::unavailable()));
        fixture.lock.unlock().await.unwrap();
        let popup = PopupController::new(fixture.router.clone());
        let dir = tempfile::tempdir().unwrap();

        assert!(matches!(
            popup.export_to(dir.path()).await,
            Err(PopupError::Storage(_))
        ));
    }
}
