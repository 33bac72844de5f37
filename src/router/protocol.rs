//! Message envelopes exchanged with pages and external clients
//!
//! The wire format is a flat JSON envelope carried identically by every
//! transport. Incoming envelopes are validated into the exhaustive
//! [`Request`] enum before dispatch; responses are built as [`Response`] and
//! flattened back into a [`ResponseEnvelope`].

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;
use ts_rs::TS;

use super::error::RouterError;

pub const ACTION_GET_ITEM: &str = "getItem";
pub const ACTION_SET_ITEM: &str = "setItem";
pub const ACTION_REMOVE_ITEM: &str = "removeItem";
pub const ACTION_CLEAR: &str = "clear";
pub const ACTION_KEYS: &str = "keys";
pub const ACTION_UNLOCK: &str = "unlock";
pub const ACTION_CLEAR_REQUESTED: &str = "clear-requested";
pub const ACTION_LOCKED: &str = "locked";
pub const ACTION_UNLOCK_REQUESTED: &str = "unlock-requested";
pub const ACTION_UNLOCKED: &str = "unlocked";

/// API family of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum RequestApi {
    #[serde(rename = "LocalStorage:Request")]
    LocalStorage,
    #[serde(rename = "Lock:Request")]
    Lock,
}

/// API family of a response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum ResponseApi {
    #[serde(rename = "LocalStorage:Response")]
    LocalStorage,
    #[serde(rename = "Lock:Response")]
    Lock,
}

impl RequestApi {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestApi::LocalStorage => "LocalStorage:Request",
            RequestApi::Lock => "Lock:Request",
        }
    }
}

/// Request as it travels over any transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, rename_all = "camelCase")]
#[serde(rename_all = "camelCase")]
pub struct RequestEnvelope {
    pub api: RequestApi,
    pub action: String,
    /// Caller-generated correlation id, echoed verbatim in the response
    pub request_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub key: Option<String>,
    /// `Some(Null)` when the field is present as `null`, `None` when absent
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    #[ts(optional)]
    pub value: Option<JsonValue>,
}

fn deserialize_present<'de, D>(deserializer: D) -> Result<Option<JsonValue>, D::Error>
where
    D: Deserializer<'de>,
{
    JsonValue::deserialize(deserializer).map(Some)
}

/// Response as it travels over any transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, rename_all = "camelCase")]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    pub api: ResponseApi,
    pub action: String,
    pub request_id: String,
    /// Present for `getItem` (possibly `null`) and `keys`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub result: Option<JsonValue>,
}

/// A validated request
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    GetItem { request_id: String, key: String },
    SetItem { request_id: String, key: String, value: JsonValue },
    RemoveItem { request_id: String, key: String },
    Clear { request_id: String },
    Keys { request_id: String },
    Unlock { request_id: String },
}

impl Request {
    pub fn request_id(&self) -> &str {
        match self {
            Request::GetItem { request_id, .. }
            | Request::SetItem { request_id, .. }
            | Request::RemoveItem { request_id, .. }
            | Request::Clear { request_id }
            | Request::Keys { request_id }
            | Request::Unlock { request_id } => request_id,
        }
    }

    pub fn api(&self) -> RequestApi {
        match self {
            Request::Unlock { .. } => RequestApi::Lock,
            _ => RequestApi::LocalStorage,
        }
    }

    pub fn action(&self) -> &'static str {
        match self {
            Request::GetItem { .. } => ACTION_GET_ITEM,
            Request::SetItem { .. } => ACTION_SET_ITEM,
            Request::RemoveItem { .. } => ACTION_REMOVE_ITEM,
            Request::Clear { .. } => ACTION_CLEAR,
            Request::Keys { .. } => ACTION_KEYS,
            Request::Unlock { .. } => ACTION_UNLOCK,
        }
    }
}

impl TryFrom<RequestEnvelope> for Request {
    type Error = RouterError;

    fn try_from(envelope: RequestEnvelope) -> Result<Self, Self::Error> {
        let RequestEnvelope {
            api,
            action,
            request_id,
            key,
            value,
        } = envelope;

        let require_key = |key: Option<String>| {
            key.ok_or_else(|| {
                RouterError::InvalidRequest(format!("{} requires a key", action))
            })
        };

        let request = match (api, action.as_str()) {
            (RequestApi::LocalStorage, ACTION_GET_ITEM) => Request::GetItem {
                key: require_key(key)?,
                request_id,
            },
            (RequestApi::LocalStorage, ACTION_SET_ITEM) => Request::SetItem {
                key: require_key(key)?,
                value: value.ok_or_else(|| {
                    RouterError::InvalidRequest(format!("{} requires a value", action))
                })?,
                request_id,
            },
            (RequestApi::LocalStorage, ACTION_REMOVE_ITEM) => Request::RemoveItem {
                key: require_key(key)?,
                request_id,
            },
            (RequestApi::LocalStorage, ACTION_CLEAR) => Request::Clear { request_id },
            (RequestApi::LocalStorage, ACTION_KEYS) => Request::Keys { request_id },
            (RequestApi::Lock, ACTION_UNLOCK) => Request::Unlock { request_id },
            (api, _) => {
                return Err(RouterError::UnknownAction {
                    api: api.as_str().to_string(),
                    action: action.clone(),
                })
            }
        };
        Ok(request)
    }
}

impl From<Request> for RequestEnvelope {
    fn from(request: Request) -> Self {
        let api = request.api();
        let action = request.action().to_string();
        match request {
            Request::GetItem { request_id, key } | Request::RemoveItem { request_id, key } => {
                Self {
                    api,
                    action,
                    request_id,
                    key: Some(key),
                    value: None,
                }
            }
            Request::SetItem {
                request_id,
                key,
                value,
            } => Self {
                api,
                action,
                request_id,
                key: Some(key),
                value: Some(value),
            },
            Request::Clear { request_id }
            | Request::Keys { request_id }
            | Request::Unlock { request_id } => Self {
                api,
                action,
                request_id,
                key: None,
                value: None,
            },
        }
    }
}

/// A response produced by the router (or the lock state, for `Unlocked`)
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    GetItem { request_id: String, result: JsonValue },
    Keys { request_id: String, result: Vec<String> },
    SetItem { request_id: String },
    RemoveItem { request_id: String },
    Clear { request_id: String },
    /// Bulk clear deferred to a confirmation in the popup
    ClearRequested { request_id: String },
    /// The gate is shut; nothing was read or written
    Locked { request_id: String },
    /// The popup was opened so a human can unlock
    UnlockRequested { request_id: String },
    /// Broadcast to every tab after a successful unlock
    Unlocked { request_id: String },
}

impl Response {
    pub fn request_id(&self) -> &str {
        match self {
            Response::GetItem { request_id, .. }
            | Response::Keys { request_id, .. }
            | Response::SetItem { request_id }
            | Response::RemoveItem { request_id }
            | Response::Clear { request_id }
            | Response::ClearRequested { request_id }
            | Response::Locked { request_id }
            | Response::UnlockRequested { request_id }
            | Response::Unlocked { request_id } => request_id,
        }
    }

    pub fn api(&self) -> ResponseApi {
        match self {
            Response::UnlockRequested { .. } | Response::Unlocked { .. } => ResponseApi::Lock,
            _ => ResponseApi::LocalStorage,
        }
    }

    pub fn action(&self) -> &'static str {
        match self {
            Response::GetItem { .. } => ACTION_GET_ITEM,
            Response::Keys { .. } => ACTION_KEYS,
            Response::SetItem { .. } => ACTION_SET_ITEM,
            Response::RemoveItem { .. } => ACTION_REMOVE_ITEM,
            Response::Clear { .. } => ACTION_CLEAR,
            Response::ClearRequested { .. } => ACTION_CLEAR_REQUESTED,
            Response::Locked { .. } => ACTION_LOCKED,
            Response::UnlockRequested { .. } => ACTION_UNLOCK_REQUESTED,
            Response::Unlocked { .. } => ACTION_UNLOCKED,
        }
    }
}

impl From<Response> for ResponseEnvelope {
    fn from(response: Response) -> Self {
        let api = response.api();
        let action = response.action().to_string();
        let (request_id, result) = match response {
            Response::GetItem { request_id, result } => (request_id, Some(result)),
            Response::Keys { request_id, result } => (
                request_id,
                Some(JsonValue::Array(
                    result.into_iter().map(JsonValue::String).collect(),
                )),
            ),
            Response::SetItem { request_id }
            | Response::RemoveItem { request_id }
            | Response::Clear { request_id }
            | Response::ClearRequested { request_id }
            | Response::Locked { request_id }
            | Response::UnlockRequested { request_id }
            | Response::Unlocked { request_id } => (request_id, None),
        };
        Self {
            api,
            action,
            request_id,
            result,
        }
    }
}

impl TryFrom<ResponseEnvelope> for Response {
    type Error = RouterError;

    fn try_from(envelope: ResponseEnvelope) -> Result<Self, Self::Error> {
        let ResponseEnvelope {
            api,
            action,
            request_id,
            result,
        } = envelope;

        let response = match (api, action.as_str()) {
            // A `null` result deserializes as `None`
            (ResponseApi::LocalStorage, ACTION_GET_ITEM) => Response::GetItem {
                request_id,
                result: result.unwrap_or(JsonValue::Null),
            },
            (ResponseApi::LocalStorage, ACTION_KEYS) => {
                let keys = match result {
                    Some(value) => serde_json::from_value::<Vec<String>>(value).map_err(|e| {
                        RouterError::InvalidRequest(format!("keys result: {}", e))
                    })?,
                    None => Vec::new(),
                };
                Response::Keys {
                    request_id,
                    result: keys,
                }
            }
            (ResponseApi::LocalStorage, ACTION_SET_ITEM) => Response::SetItem { request_id },
            (ResponseApi::LocalStorage, ACTION_REMOVE_ITEM) => Response::RemoveItem { request_id },
            (ResponseApi::LocalStorage, ACTION_CLEAR) => Response::Clear { request_id },
            (ResponseApi::LocalStorage, ACTION_CLEAR_REQUESTED) => {
                Response::ClearRequested { request_id }
            }
            (ResponseApi::LocalStorage, ACTION_LOCKED) => Response::Locked { request_id },
            (ResponseApi::Lock, ACTION_UNLOCK_REQUESTED) => Response::UnlockRequested { request_id },
            (ResponseApi::Lock, ACTION_UNLOCKED) => Response::Unlocked { request_id },
            (api, _) => {
                let api = match api {
                    ResponseApi::LocalStorage => "LocalStorage:Response",
                    ResponseApi::Lock => "Lock:Response",
                };
                return Err(RouterError::UnknownAction {
                    api: api.to_string(),
                    action: action.clone(),
                });
            }
        };
        Ok(response)
    }
}
