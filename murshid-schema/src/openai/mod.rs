//! Wire types for the OpenAI-style Chat Completions and Moderation APIs.

mod chat_request;
mod chat_response;
mod chat_stream;
mod error;
mod moderation;

pub use chat_request::{ChatCompletionRequest, ChatMessage, ChatRole};
pub use chat_response::{ChatChoice, ChatCompletionResponse, ResponseMessage, Usage};
pub use chat_stream::{ChatCompletionChunk, ChunkChoice, ChunkDelta};
pub use error::{OpenaiErrorBody, OpenaiErrorObject};
pub use moderation::{ModerationRequest, ModerationResponse, ModerationResult};
