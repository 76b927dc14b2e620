use crate::db::models::{DbChatMessage, DbChatSession, DbParentalControls, DbUserProgress};
use crate::db::schema::SQLITE_INIT;
use crate::error::MurshidError;
use chrono::{DateTime, Utc};
use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use std::{str::FromStr, time::Duration};
use tracing::info;

/// Payload for session creation (idempotent on session id).
#[derive(Debug, Clone)]
pub struct SessionCreate {
    pub id: String,
    pub user_id: String,
    pub title: String,
}

/// Payload for appending one chat message to a session.
#[derive(Debug, Clone)]
pub struct MessageCreate {
    pub id: String,
    pub session_id: String,
    pub user_id: String,
    pub role: String,
    pub content: String,
}

/// Payload for updating a user's parental-control settings.
#[derive(Debug, Clone)]
pub struct ParentalUpdate {
    pub user_id: String,
    pub enabled: bool,
    pub daily_message_limit: i64,
}

#[derive(Debug)]
pub enum DbActorMessage {
    /// Upsert the user row and the session row (no-op when both exist).
    EnsureSession(SessionCreate, RpcReplyPort<Result<(), MurshidError>>),

    /// Append one message; bumps session `updated_at` and, for user
    /// messages, the sender's progress counters.
    AppendMessage(MessageCreate, RpcReplyPort<Result<(), MurshidError>>),

    /// Sessions of one user, most recently updated first.
    ListSessions(String, RpcReplyPort<Result<Vec<DbChatSession>, MurshidError>>),

    /// Messages of one session in chronological order.
    ListMessages(
        String,
        RpcReplyPort<Result<Vec<DbChatMessage>, MurshidError>>,
    ),

    /// Delete a session and (via FK cascade) its messages.
    /// Replies `false` when the session id is unknown.
    DeleteSession(String, RpcReplyPort<Result<bool, MurshidError>>),

    /// Progress counters (zeroed when the user has no row yet).
    GetProgress(String, RpcReplyPort<Result<DbUserProgress, MurshidError>>),

    GetParentalControls(
        String,
        RpcReplyPort<Result<Option<DbParentalControls>, MurshidError>>,
    ),

    UpsertParentalControls(
        ParentalUpdate,
        RpcReplyPort<Result<DbParentalControls, MurshidError>>,
    ),

    /// Count of `user`-role messages a user sent at or after the cutoff.
    CountUserMessagesSince(
        String,
        DateTime<Utc>,
        RpcReplyPort<Result<i64, MurshidError>>,
    ),
}

#[derive(Clone)]
pub struct DbActorHandle {
    actor: ActorRef<DbActorMessage>,
}

impl DbActorHandle {
    pub async fn ensure_session(&self, create: SessionCreate) -> Result<(), MurshidError> {
        ractor::call!(self.actor, DbActorMessage::EnsureSession, create)
            .map_err(|e| MurshidError::RactorError(format!("DbActor EnsureSession RPC failed: {e}")))?
    }

    pub async fn append_message(&self, create: MessageCreate) -> Result<(), MurshidError> {
        ractor::call!(self.actor, DbActorMessage::AppendMessage, create)
            .map_err(|e| MurshidError::RactorError(format!("DbActor AppendMessage RPC failed: {e}")))?
    }

    pub async fn list_sessions(&self, user_id: &str) -> Result<Vec<DbChatSession>, MurshidError> {
        ractor::call!(
            self.actor,
            DbActorMessage::ListSessions,
            user_id.to_string()
        )
        .map_err(|e| MurshidError::RactorError(format!("DbActor ListSessions RPC failed: {e}")))?
    }

    pub async fn list_messages(
        &self,
        session_id: &str,
    ) -> Result<Vec<DbChatMessage>, MurshidError> {
        ractor::call!(
            self.actor,
            DbActorMessage::ListMessages,
            session_id.to_string()
        )
        .map_err(|e| MurshidError::RactorError(format!("DbActor ListMessages RPC failed: {e}")))?
    }

    pub async fn delete_session(&self, session_id: &str) -> Result<bool, MurshidError> {
        ractor::call!(
            self.actor,
            DbActorMessage::DeleteSession,
            session_id.to_string()
        )
        .map_err(|e| MurshidError::RactorError(format!("DbActor DeleteSession RPC failed: {e}")))?
    }

    pub async fn get_progress(&self, user_id: &str) -> Result<DbUserProgress, MurshidError> {
        ractor::call!(self.actor, DbActorMessage::GetProgress, user_id.to_string())
            .map_err(|e| MurshidError::RactorError(format!("DbActor GetProgress RPC failed: {e}")))?
    }

    pub async fn get_parental_controls(
        &self,
        user_id: &str,
    ) -> Result<Option<DbParentalControls>, MurshidError> {
        ractor::call!(
            self.actor,
            DbActorMessage::GetParentalControls,
            user_id.to_string()
        )
        .map_err(|e| {
            MurshidError::RactorError(format!("DbActor GetParentalControls RPC failed: {e}"))
        })?
    }

    pub async fn upsert_parental_controls(
        &self,
        update: ParentalUpdate,
    ) -> Result<DbParentalControls, MurshidError> {
        ractor::call!(self.actor, DbActorMessage::UpsertParentalControls, update).map_err(|e| {
            MurshidError::RactorError(format!("DbActor UpsertParentalControls RPC failed: {e}"))
        })?
    }

    pub async fn count_user_messages_since(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> Result<i64, MurshidError> {
        ractor::call!(
            self.actor,
            DbActorMessage::CountUserMessagesSince,
            user_id.to_string(),
            since
        )
        .map_err(|e| {
            MurshidError::RactorError(format!("DbActor CountUserMessagesSince RPC failed: {e}"))
        })?
    }
}

struct DbActorState {
    pool: SqlitePool,
}

struct DbActor;

#[ractor::async_trait]
impl Actor for DbActor {
    type Msg = DbActorMessage;
    type State = DbActorState;
    type Arguments = String;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        database_url: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        let connect_opts = SqliteConnectOptions::from_str(database_url.as_str())
            .map_err(|e| ActorProcessingErr::from(format!("invalid database url: {e}")))?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5))
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .connect_with(connect_opts)
            .await
            .map_err(|e| ActorProcessingErr::from(format!("db connect failed: {e}")))?;

        apply_schema(&pool)
            .await
            .map_err(|e| ActorProcessingErr::from(format!("db schema init failed: {e}")))?;

        info!("DbActor initialized");
        Ok(DbActorState { pool })
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            DbActorMessage::EnsureSession(create, reply) => {
                let res = self.ensure_session(&state.pool, create).await;
                let _ = reply.send(res);
            }
            DbActorMessage::AppendMessage(create, reply) => {
                let res = self.append_message(&state.pool, create).await;
                let _ = reply.send(res);
            }
            DbActorMessage::ListSessions(user_id, reply) => {
                let res = self.list_sessions(&state.pool, &user_id).await;
                let _ = reply.send(res);
            }
            DbActorMessage::ListMessages(session_id, reply) => {
                let res = self.list_messages(&state.pool, &session_id).await;
                let _ = reply.send(res);
            }
            DbActorMessage::DeleteSession(session_id, reply) => {
                let res = self.delete_session(&state.pool, &session_id).await;
                let _ = reply.send(res);
            }
            DbActorMessage::GetProgress(user_id, reply) => {
                let res = self.get_progress(&state.pool, &user_id).await;
                let _ = reply.send(res);
            }
            DbActorMessage::GetParentalControls(user_id, reply) => {
                let res = self.get_parental_controls(&state.pool, &user_id).await;
                let _ = reply.send(res);
            }
            DbActorMessage::UpsertParentalControls(update, reply) => {
                let res = self.upsert_parental_controls(&state.pool, update).await;
                let _ = reply.send(res);
            }
            DbActorMessage::CountUserMessagesSince(user_id, since, reply) => {
                let res = self
                    .count_user_messages_since(&state.pool, &user_id, since)
                    .await;
                let _ = reply.send(res);
            }
        }
        Ok(())
    }
}

impl DbActor {
    async fn ensure_session(
        &self,
        pool: &SqlitePool,
        create: SessionCreate,
    ) -> Result<(), MurshidError> {
        let now = Utc::now();

        sqlx::query(
            r#"
        INSERT INTO users (id, display_name, created_at, updated_at)
        VALUES (?, NULL, ?, ?)
        ON CONFLICT(id) DO NOTHING
        "#,
        )
        .bind(&create.user_id)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await?;

        let inserted = sqlx::query(
            r#"
        INSERT INTO chat_sessions (id, user_id, title, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(id) DO NOTHING
        "#,
        )
        .bind(&create.id)
        .bind(&create.user_id)
        .bind(&create.title)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await?
        .rows_affected();

        if inserted > 0 {
            sqlx::query(
                r#"
            INSERT INTO user_progress (user_id, messages_sent, sessions_started, last_active_at, updated_at)
            VALUES (?, 0, 1, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                sessions_started = sessions_started + 1,
                updated_at = excluded.updated_at
            "#,
            )
            .bind(&create.user_id)
            .bind(now)
            .bind(now)
            .execute(pool)
            .await?;
        } else {
            // An existing session id can only be reused by its owner.
            let owner: Option<String> =
                sqlx::query_scalar("SELECT user_id FROM chat_sessions WHERE id = ?")
                    .bind(&create.id)
                    .fetch_optional(pool)
                    .await?;
            if owner.as_deref() != Some(create.user_id.as_str()) {
                return Err(MurshidError::SessionNotFound(create.id));
            }
        }

        Ok(())
    }

    async fn append_message(
        &self,
        pool: &SqlitePool,
        create: MessageCreate,
    ) -> Result<(), MurshidError> {
        let now = Utc::now();

        sqlx::query(
            r#"
        INSERT INTO chat_messages (id, session_id, role, content, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
        )
        .bind(&create.id)
        .bind(&create.session_id)
        .bind(&create.role)
        .bind(&create.content)
        .bind(now)
        .execute(pool)
        .await?;

        sqlx::query("UPDATE chat_sessions SET updated_at = ? WHERE id = ?")
            .bind(now)
            .bind(&create.session_id)
            .execute(pool)
            .await?;

        if create.role == "user" {
            sqlx::query(
                r#"
            INSERT INTO user_progress (user_id, messages_sent, sessions_started, last_active_at, updated_at)
            VALUES (?, 1, 0, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                messages_sent = messages_sent + 1,
                last_active_at = excluded.last_active_at,
                updated_at = excluded.updated_at
            "#,
            )
            .bind(&create.user_id)
            .bind(now)
            .bind(now)
            .execute(pool)
            .await?;
        }

        Ok(())
    }

    async fn list_sessions(
        &self,
        pool: &SqlitePool,
        user_id: &str,
    ) -> Result<Vec<DbChatSession>, MurshidError> {
        let rows = sqlx::query_as::<_, DbChatSession>(
            r#"
        SELECT id, user_id, title, created_at, updated_at
        FROM chat_sessions
        WHERE user_id = ?
        ORDER BY updated_at DESC, id
        "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(rows)
    }

    async fn list_messages(
        &self,
        pool: &SqlitePool,
        session_id: &str,
    ) -> Result<Vec<DbChatMessage>, MurshidError> {
        let rows = sqlx::query_as::<_, DbChatMessage>(
            r#"
        SELECT id, session_id, role, content, created_at
        FROM chat_messages
        WHERE session_id = ?
        ORDER BY created_at, id
        "#,
        )
        .bind(session_id)
        .fetch_all(pool)
        .await?;

        Ok(rows)
    }

    async fn delete_session(
        &self,
        pool: &SqlitePool,
        session_id: &str,
    ) -> Result<bool, MurshidError> {
        // Messages go with the session via ON DELETE CASCADE.
        let deleted = sqlx::query("DELETE FROM chat_sessions WHERE id = ?")
            .bind(session_id)
            .execute(pool)
            .await?
            .rows_affected();

        Ok(deleted > 0)
    }

    async fn get_progress(
        &self,
        pool: &SqlitePool,
        user_id: &str,
    ) -> Result<DbUserProgress, MurshidError> {
        let row = sqlx::query_as::<_, DbUserProgress>(
            r#"
        SELECT user_id, messages_sent, sessions_started, last_active_at, updated_at
        FROM user_progress
        WHERE user_id = ?
        "#,
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(row.unwrap_or_else(|| DbUserProgress::empty(user_id)))
    }

    async fn get_parental_controls(
        &self,
        pool: &SqlitePool,
        user_id: &str,
    ) -> Result<Option<DbParentalControls>, MurshidError> {
        let row = sqlx::query_as::<_, DbParentalControls>(
            r#"
        SELECT user_id, enabled, daily_message_limit, updated_at
        FROM parental_controls
        WHERE user_id = ?
        "#,
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(row)
    }

    async fn upsert_parental_controls(
        &self,
        pool: &SqlitePool,
        update: ParentalUpdate,
    ) -> Result<DbParentalControls, MurshidError> {
        let now = Utc::now();

        sqlx::query(
            r#"
        INSERT INTO users (id, display_name, created_at, updated_at)
        VALUES (?, NULL, ?, ?)
        ON CONFLICT(id) DO NOTHING
        "#,
        )
        .bind(&update.user_id)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await?;

        let row = sqlx::query_as::<_, DbParentalControls>(
            r#"
        INSERT INTO parental_controls (user_id, enabled, daily_message_limit, updated_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(user_id) DO UPDATE SET
            enabled = excluded.enabled,
            daily_message_limit = excluded.daily_message_limit,
            updated_at = excluded.updated_at
        RETURNING user_id, enabled, daily_message_limit, updated_at
        "#,
        )
        .bind(&update.user_id)
        .bind(update.enabled)
        .bind(update.daily_message_limit)
        .bind(now)
        .fetch_one(pool)
        .await?;

        Ok(row)
    }

    async fn count_user_messages_since(
        &self,
        pool: &SqlitePool,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> Result<i64, MurshidError> {
        let count: i64 = sqlx::query_scalar(
            r#"
        SELECT COUNT(*)
        FROM chat_messages m
        JOIN chat_sessions s ON s.id = m.session_id
        WHERE s.user_id = ? AND m.role = 'user' AND m.created_at >= ?
        "#,
        )
        .bind(user_id)
        .bind(since)
        .fetch_one(pool)
        .await?;

        Ok(count)
    }
}

/// Spawn the database actor and return a cloneable handle.
pub async fn spawn(database_url: &str) -> DbActorHandle {
    let (actor, _jh) = ractor::Actor::spawn(
        Some("DbActor".to_string()),
        DbActor,
        database_url.to_string(),
    )
    .await
    .expect("failed to spawn DbActor");

    DbActorHandle { actor }
}

async fn apply_schema(pool: &SqlitePool) -> Result<(), MurshidError> {
    for stmt in SQLITE_INIT.split(';') {
        let s = stmt.trim();
        if s.is_empty() {
            continue;
        }
        sqlx::query(s).execute(pool).await?;
    }
    Ok(())
}
