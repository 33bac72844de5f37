//! Request dispatch
//!
//! Stateless per request: the only state shared between requests is the lock
//! flag. Every served request gets exactly one response carrying its
//! `requestId`; failures are returned as errors and no response is produced.

use super::error::RouterError;
use super::protocol::{Request, RequestApi, RequestEnvelope, Response, ResponseEnvelope};
use crate::host::ExtensionHost;
use crate::lock::LockState;
use crate::storage::StorageGateway;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;

/// Session storage slot telling the popup which view to open
pub const REDIRECT_KEY: &str = "redirectTo";

/// View the popup should open at when it is next shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PopupRoute {
    Clear,
}

/// How a page-initiated `clear` is handled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClearPolicy {
    /// Record a redirect intent and let a human confirm in the popup
    #[default]
    Confirm,
    /// Clear immediately
    Direct,
}

pub struct MessageRouter {
    storage: Arc<dyn StorageGateway>,
    session: Arc<dyn StorageGateway>,
    lock: Arc<LockState>,
    host: Arc<dyn ExtensionHost>,
    clear_policy: ClearPolicy,
}

impl MessageRouter {
    pub fn new(
        storage: Arc<dyn StorageGateway>,
        session: Arc<dyn StorageGateway>,
        lock: Arc<LockState>,
        host: Arc<dyn ExtensionHost>,
    ) -> Self {
        Self {
            storage,
            session,
            lock,
            host,
            clear_policy: ClearPolicy::default(),
        }
    }

    pub fn with_clear_policy(mut self, clear_policy: ClearPolicy) -> Self {
        self.clear_policy = clear_policy;
        self
    }

    pub fn clear_policy(&self) -> ClearPolicy {
        self.clear_policy
    }

    pub fn lock_state(&self) -> &Arc<LockState> {
        &self.lock
    }

    pub fn storage(&self) -> &Arc<dyn StorageGateway> {
        &self.storage
    }

    pub fn session(&self) -> &Arc<dyn StorageGateway> {
        &self.session
    }

    /// Entry point for transports carrying raw JSON
    pub async fn handle_message(&self, message: JsonValue) -> Result<JsonValue, RouterError> {
        let envelope: RequestEnvelope = serde_json::from_value(message)
            .map_err(|e| RouterError::InvalidRequest(e.to_string()))?;
        let response = self.route(envelope).await?;
        Ok(serde_json::to_value(response)?)
    }

    /// Gate, validate and dispatch an envelope.
    ///
    /// The gate is checked before validation: while locked, anything outside
    /// the lock family is answered with `locked`, whatever its action.
    pub async fn route(&self, envelope: RequestEnvelope) -> Result<ResponseEnvelope, RouterError> {
        if self.lock.is_locked() && envelope.api != RequestApi::Lock {
            tracing::debug!(
                "[Router] Rejecting {} {} while locked",
                envelope.action,
                envelope.request_id
            );
            return Ok(Response::Locked {
                request_id: envelope.request_id,
            }
            .into());
        }

        let request = Request::try_from(envelope)?;
        Ok(self.execute(request).await?.into())
    }

    /// Gate and dispatch an already validated request
    pub async fn dispatch(&self, request: Request) -> Result<Response, RouterError> {
        if self.lock.is_locked() && request.api() != RequestApi::Lock {
            return Ok(Response::Locked {
                request_id: request.request_id().to_string(),
            });
        }
        self.execute(request).await
    }

    async fn execute(&self, request: Request) -> Result<Response, RouterError> {
        tracing::debug!(
            "[Router] {} {}",
            request.action(),
            request.request_id()
        );

        let response = match request {
            Request::GetItem { request_id, key } => {
                let result = self.storage.get(&key).await?.unwrap_or(JsonValue::Null);
                Response::GetItem { request_id, result }
            }
            Request::SetItem {
                request_id,
                key,
                value,
            } => {
                self.storage.set(&key, value).await?;
                Response::SetItem { request_id }
            }
            Request::RemoveItem { request_id, key } => {
                self.storage.remove(&key).await?;
                Response::RemoveItem { request_id }
            }
            Request::Clear { request_id } => match self.clear_policy {
                ClearPolicy::Direct => {
                    self.storage.clear().await?;
                    Response::Clear { request_id }
                }
                ClearPolicy::Confirm => {
                    self.session
                        .set(REDIRECT_KEY, serde_json::to_value(PopupRoute::Clear)?)
                        .await?;
                    self.host.open_popup().await?;
                    tracing::info!("[Router] Clear requested, awaiting confirmation in popup");
                    Response::ClearRequested { request_id }
                }
            },
            Request::Keys { request_id } => {
                let all = self.storage.get_all().await?;
                Response::Keys {
                    request_id,
                    result: all.keys().cloned().collect(),
                }
            }
            Request::Unlock { request_id } => {
                // The flag is only cleared by the popup once a human acts
                self.host.open_popup().await?;
                Response::UnlockRequested { request_id }
            }
        };
        Ok(response)
    }
}
