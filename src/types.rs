//! The JSON-RPC envelope. `id` is kept as an opaque `serde_json::Value`
//! scalar throughout — it is echoed verbatim, never interpreted.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const INTERNAL_ERROR_CODE: i64 = -32603;

fn default_version() -> String {
    "2.0".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcRequest {
    pub id: Value,
    #[serde(rename = "jsonrpc", default = "default_version")]
    pub version: String,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub id: Value,
    // Some upstreams omit `jsonrpc` on error bodies; tolerate that on the
    // way in, always emit it on the way out.
    #[serde(rename = "jsonrpc", default = "default_version")]
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        JsonRpcResponse {
            id,
            version: "2.0".into(),
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Value, code: i64, message: impl Into<String>) -> Self {
        JsonRpcResponse {
            id,
            version: "2.0".into(),
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }

    pub fn internal_error(id: Value, message: impl Into<String>) -> Self {
        Self::error(id, INTERNAL_ERROR_CODE, message)
    }
}
