//! Chat Completions API streaming chunk schema.

use super::chat_request::ChatRole;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// One SSE `data:` payload of a streamed chat completion
/// ("chat completion chunk object").
///
/// Schema reference:
/// https://platform.openai.com/docs/api-reference/chat/streaming
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionChunk {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub model: String,

    #[serde(default)]
    pub choices: Vec<ChunkChoice>,

    #[serde(default, flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl ChatCompletionChunk {
    /// Incremental token text of the first choice, if any.
    pub fn token(&self) -> Option<&str> {
        self.choices.first().and_then(|c| c.delta.content.as_deref())
    }

    /// True once the first choice carries a `finish_reason`.
    pub fn is_finished(&self) -> bool {
        self.choices
            .first()
            .is_some_and(|c| c.finish_reason.is_some())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkChoice {
    #[serde(default)]
    pub index: u32,

    #[serde(default)]
    pub delta: ChunkDelta,

    #[serde(default)]
    pub finish_reason: Option<String>,

    #[serde(default, flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Delta payload. The first chunk usually carries only `role`; later
/// chunks carry `content` fragments; the last is an empty delta next to
/// `finish_reason`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChunkDelta {
    #[serde(default)]
    pub role: Option<ChatRole>,

    #[serde(default)]
    pub content: Option<String>,

    #[serde(default, flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn chunk_exposes_token_text() {
        let chunk: ChatCompletionChunk = serde_json::from_value(json!({
            "id": "chatcmpl-1",
            "object": "chat.completion.chunk",
            "choices": [{"index": 0, "delta": {"content": "مر"}, "finish_reason": null}],
        }))
        .expect("failed to deserialize");

        assert_eq!(chunk.token(), Some("مر"));
        assert!(!chunk.is_finished());
    }

    #[test]
    fn chunk_with_finish_reason_and_empty_delta_is_finished() {
        let chunk: ChatCompletionChunk = serde_json::from_value(json!({
            "choices": [{"index": 0, "delta": {}, "finish_reason": "stop"}],
        }))
        .expect("failed to deserialize");

        assert_eq!(chunk.token(), None);
        assert!(chunk.is_finished());
    }

    #[test]
    fn role_only_first_chunk_parses() {
        let chunk: ChatCompletionChunk = serde_json::from_value(json!({
            "choices": [{"delta": {"role": "assistant"}}],
        }))
        .expect("failed to deserialize");

        assert_eq!(chunk.choices[0].delta.role, Some(ChatRole::Assistant));
        assert_eq!(chunk.token(), None);
    }
}
