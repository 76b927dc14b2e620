use crate::db::models::DbUserProgress;
use crate::error::MurshidError;
use crate::server::router::MurshidState;
use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressInfo {
    pub user_id: String,
    pub messages_sent: i64,
    pub sessions_started: i64,
    pub last_active_at: Option<DateTime<Utc>>,
}

impl From<DbUserProgress> for ProgressInfo {
    fn from(row: DbUserProgress) -> Self {
        Self {
            user_id: row.user_id,
            messages_sent: row.messages_sent,
            sessions_started: row.sessions_started,
            last_active_at: row.last_active_at,
        }
    }
}

/// Users with no recorded activity get a zeroed row rather than a 404.
async fn get_progress_handler(
    State(state): State<MurshidState>,
    Path(user_id): Path<String>,
) -> Result<Json<ProgressInfo>, MurshidError> {
    let row = state.db.get_progress(&user_id).await?;
    Ok(Json(ProgressInfo::from(row)))
}

pub fn router() -> Router<MurshidState> {
    Router::new().route("/api/users/{user_id}/progress", get(get_progress_handler))
}
