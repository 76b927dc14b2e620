use crate::db::actor::ParentalUpdate;
use crate::db::models::DbParentalControls;
use crate::error::MurshidError;
use crate::server::router::MurshidState;
use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentalSettings {
    pub enabled: bool,
    pub daily_message_limit: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentalInfo {
    pub user_id: String,
    pub enabled: bool,
    pub daily_message_limit: i64,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<DbParentalControls> for ParentalInfo {
    fn from(row: DbParentalControls) -> Self {
        Self {
            user_id: row.user_id,
            enabled: row.enabled,
            daily_message_limit: row.daily_message_limit,
            updated_at: Some(row.updated_at),
        }
    }
}

/// Users without a stored row read back as disabled.
async fn get_parental_handler(
    State(state): State<MurshidState>,
    Path(user_id): Path<String>,
) -> Result<Json<ParentalInfo>, MurshidError> {
    let info = match state.db.get_parental_controls(&user_id).await? {
        Some(row) => ParentalInfo::from(row),
        None => ParentalInfo {
            user_id,
            enabled: false,
            daily_message_limit: 0,
            updated_at: None,
        },
    };
    Ok(Json(info))
}

async fn put_parental_handler(
    State(state): State<MurshidState>,
    Path(user_id): Path<String>,
    Json(settings): Json<ParentalSettings>,
) -> Result<Json<ParentalInfo>, MurshidError> {
    let limit = settings.daily_message_limit.max(0);
    let row = state
        .db
        .upsert_parental_controls(ParentalUpdate {
            user_id: user_id.clone(),
            enabled: settings.enabled,
            daily_message_limit: limit,
        })
        .await?;

    info!(
        user_id = %user_id,
        enabled = settings.enabled,
        daily_message_limit = limit,
        "Parental controls updated"
    );
    Ok(Json(ParentalInfo::from(row)))
}

/// Admin-key enforcement is layered on in the top-level router.
pub fn router() -> Router<MurshidState> {
    Router::new().route(
        "/api/users/{user_id}/parental-controls",
        get(get_parental_handler).put(put_parental_handler),
    )
}
