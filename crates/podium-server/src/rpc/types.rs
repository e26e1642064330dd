//! Inbound request frame.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Command sent by a client over the `WebSocket`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RpcRequest {
    /// Client-chosen ID echoed as `requestId` on unicast replies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Method name (e.g. `changeSong`).
    pub method: String,
    /// Optional parameters object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl RpcRequest {
    /// Build a request.
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            id: None,
            method: method.into(),
            params,
        }
    }

    /// Attach a request ID.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}
