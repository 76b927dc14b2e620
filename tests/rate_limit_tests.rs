use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use std::{
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};
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

fn chat_request(ip: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/chat")
        .header("content-type", "application/json")
        .header("x-forwarded-for", ip)
        .body(Body::from(r#"{"message":"ما هي عاصمة مصر؟"}"#))
        .expect("failed to build request")
}

#[tokio::test]
async fn sliding_window_limits_per_client_ip() {
    let db = murshid::db::spawn(&temp_database_url("rate-limit")).await;

    let mut cfg = murshid::config::Config::default();
    cfg.basic.admin_key = "pwd".to_string();
    cfg.openai.api_key = "test-key".to_string();
    // Unroutable upstream: allowed requests fail fast with 500, which still
    // counts against the window.
    cfg.openai.base_url = "http://127.0.0.1:1".parse().expect("valid url");
    cfg.openai.retry_max_times = 0;
    cfg.limits.rate_max_requests = 3;

    let state = murshid::server::router::MurshidState::new(Arc::new(cfg), db);
    let app = murshid::server::router::murshid_router(state);

    // First three requests are admitted (and die upstream with 500).
    for _ in 0..3 {
        let resp = app
            .clone()
            .oneshot(chat_request("203.0.113.7"))
            .await
            .expect("request failed");
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    // Fourth within the window -> 429 with a retry hint.
    let resp = app
        .clone()
        .oneshot(chat_request("203.0.113.7"))
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("failed to read body");
    let body: serde_json::Value = serde_json::from_slice(&bytes).expect("body not JSON");
    assert_eq!(body["error"]["code"], "RATE_LIMIT");
    let retry_after = body["error"]["details"]["retryAfterSecs"]
        .as_u64()
        .expect("retryAfterSecs missing");
    assert!(retry_after >= 1 && retry_after <= 60);

    // A different client IP has its own bucket.
    let resp = app
        .clone()
        .oneshot(chat_request("198.51.100.9"))
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    // Rejected requests are not admitted, so the original IP stays limited.
    let resp = app
        .clone()
        .oneshot(chat_request("203.0.113.7"))
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);

    // Only the first x-forwarded-for hop identifies the client.
    let resp = app
        .clone()
        .oneshot(chat_request("203.0.113.7, 10.0.0.1"))
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
}
