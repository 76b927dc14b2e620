//! Moderation API request/response schema.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Moderation request body for `POST /v1/moderations`.
///
/// Schema reference:
/// https://platform.openai.com/docs/api-reference/moderations/create
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationRequest {
    pub input: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationResponse {
    #[serde(default)]
    pub results: Vec<ModerationResult>,

    #[serde(default, flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl ModerationResponse {
    /// True when any result is flagged.
    pub fn flagged(&self) -> bool {
        self.results.iter().any(|r| r.flagged)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationResult {
    #[serde(default)]
    pub flagged: bool,

    #[serde(default)]
    pub categories: BTreeMap<String, bool>,

    #[serde(default, flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn moderation_response_reports_flagged() {
        let resp: ModerationResponse = serde_json::from_value(json!({
            "id": "modr-1",
            "results": [{
                "flagged": true,
                "categories": {"violence": true, "hate": false},
                "category_scores": {"violence": 0.93},
            }],
        }))
        .expect("failed to deserialize");

        assert!(resp.flagged());
        assert_eq!(resp.results[0].categories.get("violence"), Some(&true));
    }

    #[test]
    fn empty_results_are_not_flagged() {
        let resp: ModerationResponse =
            serde_json::from_value(json!({"results": []})).expect("failed to deserialize");
        assert!(!resp.flagged());
    }
}
