mod extract;
mod handlers;
mod respond;

pub use extract::{ChatPreprocess, ChatTurn};
pub use respond::ChatReply;

use crate::server::router::MurshidState;
use axum::{Router, routing::post};

pub fn router() -> Router<MurshidState> {
    Router::new()
        .route("/api/chat", post(handlers::chat_handler))
        .route("/api/chat/stream", post(handlers::chat_stream_handler))
}
