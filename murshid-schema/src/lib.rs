pub mod openai;

pub use openai::{
    ChatChoice, ChatCompletionChunk, ChatCompletionRequest, ChatCompletionResponse, ChatMessage,
    ChatRole, ChunkChoice, ChunkDelta, ModerationRequest, ModerationResponse, OpenaiErrorBody,
    OpenaiErrorObject,
};
