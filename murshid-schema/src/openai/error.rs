//! Upstream error body schema shared by the completion and moderation APIs.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Standard OpenAI error envelope: `{"error": {...}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenaiErrorBody {
    pub error: OpenaiErrorObject,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenaiErrorObject {
    #[serde(default)]
    pub message: String,

    /// `invalid_request_error`, `rate_limit_error`, ...
    #[serde(default, rename = "type")]
    pub kind: Option<String>,

    /// String or number depending on the error class.
    #[serde(default)]
    pub code: Option<Value>,

    #[serde(default, flatten)]
    pub extra: BTreeMap<String, Value>,
}
