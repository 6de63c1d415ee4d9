//! GroupMe response envelope decoding.
//!
//! Every API response is wrapped as:
//!
//! ```json
//! {"meta": {"code": 200, "errors": []}, "response": <payload>}
//! ```
//!
//! Decoding happens in three steps, each with its own error:
//! structure ([`GroupGraphError::Envelope`]), status band
//! ([`GroupGraphError::Status`]) and payload shape ([`GroupGraphError::Decode`]).

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{GgResult, GroupGraphError};

/// The `meta` block of a response.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Meta {
    pub code: i64,
    #[serde(default)]
    pub errors: Option<Vec<String>>,
}

impl Meta {
    /// Whether the code is in the 2xx band.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.code)
    }
}

/// Unwrap a response body and decode its payload into `T`.
pub fn open<T: DeserializeOwned>(body: &[u8]) -> GgResult<T> {
    let payload = open_value(body)?;
    serde_json::from_value(payload).map_err(|e| GroupGraphError::Decode(e.to_string()))
}

/// Unwrap a response body whose payload is irrelevant (destroy, remove).
pub fn open_empty(body: &[u8]) -> GgResult<()> {
    open_value(body).map(|_| ())
}

/// Validate the envelope and return the raw `response` value (`null` when absent).
pub fn open_value(body: &[u8]) -> GgResult<Value> {
    let root: Value = serde_json::from_slice(body)
        .map_err(|e| GroupGraphError::Envelope(format!("body is not JSON: {}", e)))?;

    let Value::Object(mut root) = root else {
        return Err(GroupGraphError::Envelope("body is not a JSON object".to_string()));
    };

    let meta_value = root
        .remove("meta")
        .ok_or_else(|| GroupGraphError::Envelope("missing 'meta'".to_string()))?;
    let meta: Meta = serde_json::from_value(meta_value)
        .map_err(|e| GroupGraphError::Envelope(format!("invalid 'meta': {}", e)))?;

    if !meta.is_success() {
        return Err(GroupGraphError::Status {
            code: meta.code,
            errors: meta.errors.unwrap_or_default(),
        });
    }

    Ok(root.remove("response").unwrap_or(Value::Null))
}
