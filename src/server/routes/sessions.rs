use crate::db::models::{DbChatMessage, DbChatSession};
use crate::error::MurshidError;
use crate::server::router::MurshidState;
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<DbChatSession> for SessionInfo {
    fn from(row: DbChatSession) -> Self {
        Self {
            id: row.id,
            title: row.title,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionList {
    pub sessions: Vec<SessionInfo>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageInfo {
    pub id: String,
    pub role: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl From<DbChatMessage> for MessageInfo {
    fn from(row: DbChatMessage) -> Self {
        Self {
            id: row.id,
            role: row.role,
            content: row.content,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageList {
    pub messages: Vec<MessageInfo>,
}

async fn list_sessions_handler(
    State(state): State<MurshidState>,
    Path(user_id): Path<String>,
) -> Result<Json<SessionList>, MurshidError> {
    let rows = state.db.list_sessions(&user_id).await?;
    Ok(Json(SessionList {
        sessions: rows.into_iter().map(SessionInfo::from).collect(),
    }))
}

/// Unknown sessions answer with an empty list, not 404; the front end
/// polls this before the first message is ever sent.
async fn list_messages_handler(
    State(state): State<MurshidState>,
    Path(session_id): Path<String>,
) -> Result<Json<MessageList>, MurshidError> {
    let rows = state.db.list_messages(&session_id).await?;
    Ok(Json(MessageList {
        messages: rows.into_iter().map(MessageInfo::from).collect(),
    }))
}

async fn delete_session_handler(
    State(state): State<MurshidState>,
    Path(session_id): Path<String>,
) -> Result<StatusCode, MurshidError> {
    if state.db.delete_session(&session_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(MurshidError::SessionNotFound(session_id))
    }
}

pub fn router() -> Router<MurshidState> {
    Router::new()
        .route("/api/users/{user_id}/sessions", get(list_sessions_handler))
        .route(
            "/api/sessions/{session_id}/messages",
            get(list_messages_handler),
        )
        .route("/api/sessions/{session_id}", delete(delete_session_handler))
}
