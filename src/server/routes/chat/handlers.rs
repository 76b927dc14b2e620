use super::extract::{ChatPreprocess, ChatTurn};
use super::respond;
use crate::api::OpenAiClient;
use crate::db::actor::{MessageCreate, SessionCreate};
use crate::error::MurshidError;
use crate::server::guards::rate_limit::RateGuard;
use crate::server::router::MurshidState;
use axum::{
    Json,
    extract::State,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use murshid_schema::{ChatCompletionResponse, ChatMessage};
use tracing::{info, warn};
use uuid::Uuid;

const TITLE_MAX_CHARS: usize = 60;

pub async fn chat_handler(
    State(state): State<MurshidState>,
    _guard: RateGuard,
    ChatPreprocess(turn): ChatPreprocess,
) -> Result<Json<respond::ChatReply>, MurshidError> {
    let history = begin_turn(&state, &turn).await?;
    let client = OpenAiClient::new(&state.cfg.openai, state.client.clone());

    if moderation_flagged(&state, &client, &turn).await {
        let reply = finish_turn(&state, &turn, state.cfg.tutor.refusal_reply.clone()).await?;
        return Ok(Json(reply));
    }

    let upstream = client
        .chat_completion(build_messages(&state, &history, &turn), false)
        .await?;
    let body = upstream.json::<ChatCompletionResponse>().await?;
    let content = body
        .first_content()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or(MurshidError::EmptyCompletion)?
        .to_string();

    let reply = finish_turn(&state, &turn, content).await?;
    Ok(Json(reply))
}

pub async fn chat_stream_handler(
    State(state): State<MurshidState>,
    _guard: RateGuard,
    ChatPreprocess(turn): ChatPreprocess,
) -> Result<Response, MurshidError> {
    let history = begin_turn(&state, &turn).await?;
    let client = OpenAiClient::new(&state.cfg.openai, state.client.clone());

    if moderation_flagged(&state, &client, &turn).await {
        let reply = state.cfg.tutor.refusal_reply.clone();
        return respond::refusal_stream(&state.db, &turn, reply).await;
    }

    let upstream = client
        .chat_completion(build_messages(&state, &history, &turn), true)
        .await?;

    Ok(respond::build_stream_response(upstream, state.db.clone(), turn).into_response())
}

/// Shared lead-in for both chat routes: parental daily cap, session upsert,
/// history fetch, then persistence of the incoming user message.
async fn begin_turn(
    state: &MurshidState,
    turn: &ChatTurn,
) -> Result<Vec<crate::db::models::DbChatMessage>, MurshidError> {
    enforce_daily_cap(state, &turn.user_id).await?;

    state
        .db
        .ensure_session(SessionCreate {
            id: turn.session_id.clone(),
            user_id: turn.user_id.clone(),
            title: session_title(&turn.message),
        })
        .await?;

    let mut history = state.db.list_messages(&turn.session_id).await?;
    let keep = state.cfg.tutor.history_limit;
    if history.len() > keep {
        history.drain(..history.len() - keep);
    }

    state
        .db
        .append_message(MessageCreate {
            id: Uuid::new_v4().to_string(),
            session_id: turn.session_id.clone(),
            user_id: turn.user_id.clone(),
            role: "user".to_string(),
            content: turn.message.clone(),
        })
        .await?;

    info!(
        session_id = %turn.session_id,
        user_id = %turn.user_id,
        new_session = turn.new_session,
        history_len = history.len(),
        "Chat turn accepted"
    );

    Ok(history)
}

/// Rejects the turn when parental controls are enabled and today's sent
/// count has reached the cap. A limit of zero blocks every message.
async fn enforce_daily_cap(state: &MurshidState, user_id: &str) -> Result<(), MurshidError> {
    let Some(controls) = state.db.get_parental_controls(user_id).await? else {
        return Ok(());
    };
    if !controls.enabled {
        return Ok(());
    }

    let midnight = Utc::now()
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .expect("midnight is a valid time")
        .and_utc();
    let sent = state.db.count_user_messages_since(user_id, midnight).await?;
    if sent >= controls.daily_message_limit {
        return Err(MurshidError::DailyLimitReached {
            limit: controls.daily_message_limit,
        });
    }
    Ok(())
}

async fn moderation_flagged(state: &MurshidState, client: &OpenAiClient, turn: &ChatTurn) -> bool {
    if !state.cfg.openai.moderation {
        return false;
    }
    match client.moderate(&turn.message).await {
        Ok(flagged) => flagged,
        Err(e) => {
            // Moderation is advisory; a dead endpoint must not take chat down.
            warn!("Moderation call failed, continuing without it: {e}");
            false
        }
    }
}

fn build_messages(
    state: &MurshidState,
    history: &[crate::db::models::DbChatMessage],
    turn: &ChatTurn,
) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage::system(state.cfg.tutor.system_prompt.clone()));
    for row in history {
        match row.role.as_str() {
            "assistant" => messages.push(ChatMessage::assistant(row.content.clone())),
            _ => messages.push(ChatMessage::user(row.content.clone())),
        }
    }
    messages.push(ChatMessage::user(turn.message.clone()));
    messages
}

/// Persists the assistant reply and shapes the JSON response.
async fn finish_turn(
    state: &MurshidState,
    turn: &ChatTurn,
    content: String,
) -> Result<respond::ChatReply, MurshidError> {
    let message_id = Uuid::new_v4().to_string();
    state
        .db
        .append_message(MessageCreate {
            id: message_id.clone(),
            session_id: turn.session_id.clone(),
            user_id: turn.user_id.clone(),
            role: "assistant".to_string(),
            content: content.clone(),
        })
        .await?;

    Ok(respond::ChatReply {
        content,
        is_complete: true,
        message_id,
        session_id: turn.session_id.clone(),
        user_id: turn.user_id.clone(),
    })
}

fn session_title(message: &str) -> String {
    let mut title: String = message.chars().take(TITLE_MAX_CHARS).collect();
    if message.chars().count() > TITLE_MAX_CHARS {
        title.push('…');
    }
    title
}
