use axum::{
    Json, Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
    response::IntoResponse,
    routing::post,
};
use std::{
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};
use tokio::net::TcpListener;
use tower::ServiceExt;

fn temp_database_url(tag: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before UNIX_EPOCH")
        .as_nanos();
    let mut temp_path = std::env::temp_dir();
    temp_path.push(format!(
        "murshid-{tag}-{}-{}.sqlite",
        std::process::id(),
        nanos
    ));
    format!("sqlite:{}", temp_path.display())
}

const REPLY_TEXT: &str = "النيل هو أطول نهر في العالم.";

/// Stand-in for the completions endpoint: JSON for `stream: false`,
/// a token-per-event SSE body for `stream: true`.
async fn mock_completions(Json(payload): Json<serde_json::Value>) -> axum::response::Response {
    if payload["stream"].as_bool().unwrap_or(false) {
        let body = concat!(
            "data: {\"choices\":[{\"index\":0,\"delta\":{\"role\":\"assistant\"}}]}\n\n",
            "data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"النيل \"}}]}\n\n",
            "data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"أطول نهر\"}}]}\n\n",
            "data: {\"choices\":[{\"index\":0,\"delta\":{},\"finish_reason\":\"stop\"}]}\n\n",
            "data: [DONE]\n\n"
        );
        (
            [(header::CONTENT_TYPE, "text/event-stream")],
            body,
        )
            .into_response()
    } else {
        Json(serde_json::json!({
            "id": "chatcmpl-test",
            "object": "chat.completion",
            "model": "gpt-4o-mini",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": REPLY_TEXT},
                "finish_reason": "stop",
            }],
            "usage": {"prompt_tokens": 20, "completion_tokens": 8, "total_tokens": 28},
        }))
        .into_response()
    }
}

#[tokio::test]
async fn chat_routes_relay_upstream_and_persist() {
    let upstream = Router::new().route("/v1/chat/completions", post(mock_completions));
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind mock upstream");
    let upstream_addr = listener.local_addr().expect("mock upstream has no addr");
    tokio::spawn(async move {
        axum::serve(listener, upstream).await.expect("mock upstream died");
    });

    let db = murshid::db::spawn(&temp_database_url("chat-upstream")).await;

    let mut cfg = murshid::config::Config::default();
    cfg.basic.admin_key = "pwd".to_string();
    cfg.openai.api_key = "test-key".to_string();
    cfg.openai.base_url = format!("http://{upstream_addr}")
        .parse()
        .expect("valid mock url");

    let state = murshid::server::router::MurshidState::new(Arc::new(cfg), db.clone());
    let app = murshid::server::router::murshid_router(state);

    // 1) JSON route: full reply with minted ids.
    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/chat")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"message":"ما هو أطول نهر في العالم؟"}"#))
                .expect("failed to build request"),
        )
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("failed to read body");
    let body: serde_json::Value = serde_json::from_slice(&bytes).expect("body not JSON");
    assert_eq!(body["content"], REPLY_TEXT);
    assert_eq!(body["isComplete"], true);
    let session_id = body["sessionId"].as_str().expect("sessionId missing").to_string();
    let user_id = body["userId"].as_str().expect("userId missing").to_string();
    assert!(!body["messageId"].as_str().expect("messageId missing").is_empty());

    // 2) Reusing the session id under a different user -> 404.
    let payload = serde_json::json!({
        "message": "أكمل الشرح",
        "sessionId": session_id,
        "userId": "intruder",
    })
    .to_string();
    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/chat")
                .header("content-type", "application/json")
                .body(Body::from(payload))
                .expect("failed to build request"),
        )
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("failed to read body");
    let body: serde_json::Value = serde_json::from_slice(&bytes).expect("body not JSON");
    assert_eq!(body["error"]["code"], "SESSION_NOT_FOUND");

    // 3) Both turns were persisted in order.
    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(format!("/api/sessions/{session_id}/messages"))
                .body(Body::empty())
                .expect("failed to build request"),
        )
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("failed to read body");
    let body: serde_json::Value = serde_json::from_slice(&bytes).expect("body not JSON");
    let messages = body["messages"].as_array().expect("messages missing");
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["role"], "user");
    assert_eq!(messages[1]["role"], "assistant");
    assert_eq!(messages[1]["content"], REPLY_TEXT);

    // 4) The session shows up for the user, titled from the first message.
    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(format!("/api/users/{user_id}/sessions"))
                .body(Body::empty())
                .expect("failed to build request"),
        )
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("failed to read body");
    let body: serde_json::Value = serde_json::from_slice(&bytes).expect("body not JSON");
    let sessions = body["sessions"].as_array().expect("sessions missing");
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0]["id"], session_id.as_str());
    assert!(
        sessions[0]["title"]
            .as_str()
            .expect("title missing")
            .starts_with("ما هو أطول نهر")
    );

    // 5) Progress counted the user message and the new session.
    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(format!("/api/users/{user_id}/progress"))
                .body(Body::empty())
                .expect("failed to build request"),
        )
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("failed to read body");
    let body: serde_json::Value = serde_json::from_slice(&bytes).expect("body not JSON");
    assert_eq!(body["messagesSent"], 1);
    assert_eq!(body["sessionsStarted"], 1);

    // 6) Stream route: tokens relayed one per event, closed by [DONE].
    let payload = serde_json::json!({
        "message": "تابع من فضلك",
        "sessionId": session_id,
        "userId": user_id,
    })
    .to_string();
    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/chat/stream")
                .header("content-type", "application/json")
                .body(Body::from(payload))
                .expect("failed to build request"),
        )
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::OK);
    let content_type = resp
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    assert!(content_type.starts_with("text/event-stream"));
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("failed to read stream body");
    let stream_body = String::from_utf8_lossy(&bytes);
    assert!(stream_body.contains("data: النيل"));
    assert!(stream_body.contains("data: أطول نهر"));
    assert!(stream_body.contains("data: [DONE]"));
    // The role-only first chunk and the empty finish delta are not relayed.
    assert!(!stream_body.contains("assistant"));

    // 7) The streamed reply is persisted off the response path.
    let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
    loop {
        let rows = db
            .list_messages(&session_id)
            .await
            .expect("list_messages failed");
        if rows.len() == 4 {
            assert_eq!(rows[3].role, "assistant");
            assert_eq!(rows[3].content, "النيل أطول نهر");
            break;
        }
        assert!(
            std::time::Instant::now() < deadline,
            "streamed reply was never persisted"
        );
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
}
