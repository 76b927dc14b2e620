use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct DbChatSession {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct DbChatMessage {
    pub id: String,
    pub session_id: String,
    /// `user` or `assistant` (enforced by a CHECK constraint).
    pub role: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct DbUserProgress {
    pub user_id: String,
    pub messages_sent: i64,
    pub sessions_started: i64,
    pub last_active_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl DbUserProgress {
    /// Zeroed counters for users without a progress row yet.
    pub fn empty(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            messages_sent: 0,
            sessions_started: 0,
            last_active_at: None,
            updated_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct DbParentalControls {
    pub user_id: String,
    pub enabled: bool,
    pub daily_message_limit: i64,
    pub updated_at: DateTime<Utc>,
}
