use crate::error::MurshidError;
use crate::server::router::MurshidState;
use axum::{Json, extract::FromRequest, extract::Request};
use serde::Deserialize;
use std::borrow::Borrow;
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ChatRequestBody {
    message: String,
    session_id: Option<String>,
    user_id: Option<String>,
}

/// One validated turn of the conversation. Missing session/user ids are
/// minted here so every later stage works with concrete ids.
#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub message: String,
    pub session_id: String,
    pub user_id: String,
    pub new_session: bool,
}

/// Extractor shared by the JSON and SSE chat routes: parses the body,
/// trims the message and enforces the length cap before any handler runs.
pub struct ChatPreprocess(pub ChatTurn);

impl<S> FromRequest<S> for ChatPreprocess
where
    S: Borrow<MurshidState> + Send + Sync,
{
    type Rejection = MurshidError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let state: &MurshidState = state.borrow();

        let Json(body) = Json::<ChatRequestBody>::from_request(req, &())
            .await
            .map_err(|rejection| MurshidError::BadRequestBody(rejection.to_string()))?;

        let message = body.message.trim().to_string();
        if message.is_empty() {
            return Err(MurshidError::EmptyMessage);
        }

        let length = message.chars().count();
        if length > state.cfg.limits.max_message_chars {
            return Err(MurshidError::MessageTooLong(length));
        }

        let new_session = body.session_id.is_none();
        let session_id = body
            .session_id
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let user_id = body.user_id.unwrap_or_else(|| Uuid::new_v4().to_string());

        Ok(ChatPreprocess(ChatTurn {
            message,
            session_id,
            user_id,
            new_session,
        }))
    }
}
