use super::extract::ChatTurn;
use crate::db::actor::{DbActorHandle, MessageCreate};
use crate::error::MurshidError;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use eventsource_stream::Eventsource;
use futures::{Stream, TryStreamExt, future};
use murshid_schema::ChatCompletionChunk;
use serde::Serialize;
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::StreamExt;
use tracing::{error, warn};
use uuid::Uuid;

/// Idle cutoff for the upstream token stream.
const STREAM_IDLE_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub content: String,
    pub is_complete: bool,
    pub message_id: String,
    pub session_id: String,
    pub user_id: String,
}

/// Relays the upstream SSE body to the client one token per event,
/// accumulating the full reply so it can be persisted at `[DONE]`.
pub fn build_stream_response(
    upstream: reqwest::Response,
    db: DbActorHandle,
    turn: ChatTurn,
) -> impl IntoResponse {
    let relay = transform_stream(upstream.bytes_stream().eventsource(), db, turn);

    let timed = relay
        .timeout(STREAM_IDLE_TIMEOUT)
        .map(|item| match item {
            Ok(Ok(event)) => Ok(event),
            Ok(Err(e)) => {
                error!("Upstream SSE stream failed: {e}");
                Err(MurshidError::StreamProtocolError(e.to_string()))
            }
            Err(_elapsed) => {
                error!("Upstream SSE stream idle for 60s, closing");
                Err(MurshidError::StreamProtocolError(
                    "stream idle timeout".to_string(),
                ))
            }
        });

    Sse::new(timed).keep_alive(KeepAlive::default())
}

/// Serves the fixed refusal reply through the same SSE shape the relay
/// produces, so flagged turns are indistinguishable on the wire.
pub async fn refusal_stream(
    db: &DbActorHandle,
    turn: &ChatTurn,
    reply: String,
) -> Result<Response, MurshidError> {
    db.append_message(MessageCreate {
        id: Uuid::new_v4().to_string(),
        session_id: turn.session_id.clone(),
        user_id: turn.user_id.clone(),
        role: "assistant".to_string(),
        content: reply.clone(),
    })
    .await?;

    let events = futures::stream::iter(vec![
        Ok::<_, Infallible>(Event::default().data(reply)),
        Ok(Event::default().data("[DONE]")),
    ]);

    Ok(Sse::new(events).keep_alive(KeepAlive::default()).into_response())
}

fn transform_stream<I, E>(
    input: I,
    db: DbActorHandle,
    turn: ChatTurn,
) -> impl Stream<Item = Result<Event, E>>
where
    I: Stream<Item = Result<eventsource_stream::Event, E>>,
{
    let mut full_reply = String::new();

    input.try_filter_map(move |upstream_event| {
        let out = if upstream_event.data == "[DONE]" {
            let text = std::mem::take(&mut full_reply);
            if !text.is_empty() {
                let db = db.clone();
                let create = MessageCreate {
                    id: Uuid::new_v4().to_string(),
                    session_id: turn.session_id.clone(),
                    user_id: turn.user_id.clone(),
                    role: "assistant".to_string(),
                    content: text,
                };
                // Persist off the response path; the client already has
                // every token.
                tokio::spawn(async move {
                    if let Err(e) = db.append_message(create).await {
                        warn!("Failed to persist streamed reply: {e}");
                    }
                });
            }
            Some(Event::default().data("[DONE]"))
        } else if upstream_event.data.is_empty() {
            None
        } else {
            match serde_json::from_str::<ChatCompletionChunk>(&upstream_event.data) {
                Ok(chunk) => match chunk.token() {
                    Some(token) if !token.is_empty() => {
                        full_reply.push_str(token);
                        Some(Event::default().data(token.to_string()))
                    }
                    _ => None,
                },
                Err(e) => {
                    warn!("Skipping unparseable SSE chunk: {e}");
                    None
                }
            }
        };

        future::ready(Ok(out))
    })
}
