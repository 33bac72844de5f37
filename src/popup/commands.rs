// src/popup/commands.rs

use super::error::PopupError;
use crate::host::TabDelivery;
use crate::router::{MessageRouter, PopupRoute, Request, Response, REDIRECT_KEY};
use crate::storage::StorageMap;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use ts_rs::TS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Warning,
    Error,
}

/// Short message the popup shows after an import or export
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct ImportReport {
    pub imported: usize,
    pub failed: usize,
}

impl ImportReport {
    pub fn notice(&self) -> Notice {
        let (level, message) = match (self.imported, self.failed) {
            (0, 0) => (NoticeLevel::Warning, "Nothing to import".to_string()),
            (imported, 0) => (NoticeLevel::Success, format!("Imported {} items", imported)),
            (0, failed) => (NoticeLevel::Error, format!("Import failed for all {} items", failed)),
            (imported, failed) => (
                NoticeLevel::Warning,
                format!("Imported {} items, {} failed", imported, failed),
            ),
        };
        Notice { level, message }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export, rename_all = "camelCase")]
#[serde(rename_all = "camelCase")]
pub struct ExportReport {
    #[ts(type = "string")]
    pub path: PathBuf,
    pub entries: usize,
}

impl ExportReport {
    pub fn notice(&self) -> Notice {
        Notice {
            level: NoticeLevel::Success,
            message: format!("Exported {} items to {}", self.entries, self.path.display()),
        }
    }
}

/// Commands issued by the popup on behalf of the user
pub struct PopupController {
    router: Arc<MessageRouter>,
}

impl PopupController {
    pub fn new(router: Arc<MessageRouter>) -> Self {
        Self { router }
    }

    pub fn is_locked(&self) -> bool {
        self.router.lock_state().is_locked()
    }

    pub async fn unlock(&self) -> Result<Vec<TabDelivery>, PopupError> {
        Ok(self.router.lock_state().unlock().await?)
    }

    pub async fn lock(&self) -> Result<(), PopupError> {
        Ok(self.router.lock_state().lock().await?)
    }

    /// View the popup should open at, if a page asked for one
    pub async fn pending_route(&self) -> Result<Option<PopupRoute>, PopupError> {
        let Some(value) = self.router.session().get(REDIRECT_KEY).await? else {
            return Ok(None);
        };
        match serde_json::from_value(value) {
            Ok(route) => Ok(Some(route)),
            Err(e) => {
                tracing::warn!("[Popup] Ignoring unknown redirect intent: {}", e);
                Ok(None)
            }
        }
    }

    /// Clear the persistent store a page asked to clear
    pub async fn confirm_clear(&self) -> Result<(), PopupError> {
        if self.is_locked() {
            return Err(PopupError::Locked);
        }
        if self.pending_route().await? != Some(PopupRoute::Clear) {
            return Err(PopupError::NothingPending);
        }

        self.router.storage().clear().await?;
        self.router.session().remove(REDIRECT_KEY).await?;
        tracing::info!("[Popup] Storage cleared after confirmation");
        Ok(())
    }

    pub async fn dismiss_clear(&self) -> Result<(), PopupError> {
        self.router.session().remove(REDIRECT_KEY).await?;
        tracing::info!("[Popup] Clear request dismissed");
        Ok(())
    }

    /// Import a flat JSON object, one `setItem` per entry
    pub async fn import_json(&self, text: &str) -> Result<ImportReport, PopupError> {
        if self.is_locked() {
            return Err(PopupError::Locked);
        }

        let parsed: serde_json::Value =
            serde_json::from_str(text).map_err(|e| PopupError::InvalidImport {
                reason: e.to_string(),
            })?;
        let serde_json::Value::Object(entries) = parsed else {
            return Err(PopupError::InvalidImport {
                reason: "top-level value is not an object".to_string(),
            });
        };

        let mut report = ImportReport::default();
        for (key, value) in entries {
            let request = Request::SetItem {
                request_id: uuid::Uuid::new_v4().to_string(),
                key: key.clone(),
                value,
            };
            match self.router.dispatch(request).await {
                Ok(Response::SetItem { .. }) => report.imported += 1,
                Ok(other) => {
                    tracing::warn!("[Popup] Import of {:?} answered {}", key, other.action());
                    report.failed += 1;
                }
                Err(e) => {
                    tracing::warn!("[Popup] Import of {:?} failed: {}", key, e);
                    report.failed += 1;
                }
            }
        }

        tracing::info!(
            "[Popup] Import finished: {} imported, {} failed",
            report.imported,
            report.failed
        );
        Ok(report)
    }

    /// Write every item to `storage-export-<timestamp>.json` inside `dir`
    pub async fn export_to(&self, dir: &Path) -> Result<ExportReport, PopupError> {
        self.export_at(dir, OffsetDateTime::now_utc()).await
    }

    pub(crate) async fn export_at(
        &self,
        dir: &Path,
        at: OffsetDateTime,
    ) -> Result<ExportReport, PopupError> {
        if self.is_locked() {
            return Err(PopupError::Locked);
        }

        let items: StorageMap = self.router.storage().get_all().await?;
        let body = serde_json::to_string_pretty(&items)?;
        let path = dir.join(export_file_name(at)?);

        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| io_error(dir, e))?;
        tokio::fs::write(&path, body)
            .await
            .map_err(|e| io_error(&path, e))?;

        tracing::info!("[Popup] Exported {} items to {}", items.len(), path.display());
        Ok(ExportReport {
            path,
            entries: items.len(),
        })
    }
}

/// RFC 3339 timestamp with `:` swapped out so the name is portable
pub(crate) fn export_file_name(at: OffsetDateTime) -> Result<String, PopupError> {
    let stamp = at.format(&Rfc3339).map_err(|e| PopupError::Json {
        reason: e.to_string(),
    })?;
    Ok(format!("storage-export-{}.json", stamp.replace(':', "-")))
}

fn io_error(path: &Path, e: std::io::Error) -> PopupError {
    PopupError::Io {
        path: path.display().to_string(),
        reason: e.to_string(),
    }
}
