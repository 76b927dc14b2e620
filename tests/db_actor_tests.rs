use chrono::{Duration as ChronoDuration, Utc};
use murshid::db::{MessageCreate, ParentalUpdate, SessionCreate};
use std::time::{SystemTime, UNIX_EPOCH};

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

#[tokio::test]
async fn db_actor_covers_sessions_messages_progress_and_controls() {
    let db = murshid::db::spawn(&temp_database_url("db-actor")).await;

    // Session creation is idempotent; the original title survives.
    db.ensure_session(SessionCreate {
        id: "s1".to_string(),
        user_id: "u1".to_string(),
        title: "الدرس الأول".to_string(),
    })
    .await
    .expect("ensure_session failed");
    db.ensure_session(SessionCreate {
        id: "s1".to_string(),
        user_id: "u1".to_string(),
        title: "عنوان آخر".to_string(),
    })
    .await
    .expect("ensure_session failed");

    let sessions = db.list_sessions("u1").await.expect("list_sessions failed");
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].title, "الدرس الأول");

    // A different user cannot claim an existing session id.
    let err = db
        .ensure_session(SessionCreate {
            id: "s1".to_string(),
            user_id: "u2".to_string(),
            title: "عنوان دخيل".to_string(),
        })
        .await
        .expect_err("foreign session id must be rejected");
    assert!(matches!(err, murshid::MurshidError::SessionNotFound(_)));
    assert!(
        db.list_sessions("u2")
            .await
            .expect("list_sessions failed")
            .is_empty()
    );

    // Messages come back in insertion order.
    for (id, role, content) in [
        ("m1", "user", "ما هي الجاذبية؟"),
        ("m2", "assistant", "الجاذبية قوة تجذب الأجسام نحو بعضها."),
        ("m3", "user", "أعطني مثالاً"),
    ] {
        db.append_message(MessageCreate {
            id: id.to_string(),
            session_id: "s1".to_string(),
            user_id: "u1".to_string(),
            role: role.to_string(),
            content: content.to_string(),
        })
        .await
        .expect("append_message failed");
    }

    let messages = db.list_messages("s1").await.expect("list_messages failed");
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[0].id, "m1");
    assert_eq!(messages[2].id, "m3");

    // Progress counts user messages only, plus the session start.
    let progress = db.get_progress("u1").await.expect("get_progress failed");
    assert_eq!(progress.messages_sent, 2);
    assert_eq!(progress.sessions_started, 1);
    assert!(progress.last_active_at.is_some());

    // Unknown users read back a zeroed row.
    let empty = db.get_progress("nobody").await.expect("get_progress failed");
    assert_eq!(empty.messages_sent, 0);
    assert_eq!(empty.sessions_started, 0);
    assert!(empty.last_active_at.is_none());

    // Today's user-message count, as used by the daily cap.
    let midnight = Utc::now()
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .expect("midnight is a valid time")
        .and_utc();
    let today = db
        .count_user_messages_since("u1", midnight)
        .await
        .expect("count failed");
    assert_eq!(today, 2);
    let tomorrow = db
        .count_user_messages_since("u1", Utc::now() + ChronoDuration::hours(1))
        .await
        .expect("count failed");
    assert_eq!(tomorrow, 0);

    // Parental controls: absent, then upserted twice.
    assert!(
        db.get_parental_controls("u1")
            .await
            .expect("get_parental_controls failed")
            .is_none()
    );
    let row = db
        .upsert_parental_controls(ParentalUpdate {
            user_id: "u1".to_string(),
            enabled: true,
            daily_message_limit: 10,
        })
        .await
        .expect("upsert failed");
    assert!(row.enabled);
    assert_eq!(row.daily_message_limit, 10);

    let row = db
        .upsert_parental_controls(ParentalUpdate {
            user_id: "u1".to_string(),
            enabled: false,
            daily_message_limit: 3,
        })
        .await
        .expect("upsert failed");
    assert!(!row.enabled);
    assert_eq!(row.daily_message_limit, 3);
    let stored = db
        .get_parental_controls("u1")
        .await
        .expect("get_parental_controls failed")
        .expect("row missing after upsert");
    assert_eq!(stored.daily_message_limit, 3);

    // Deleting the session cascades to its messages.
    assert!(db.delete_session("s1").await.expect("delete failed"));
    assert!(!db.delete_session("s1").await.expect("delete failed"));
    assert!(
        db.list_messages("s1")
            .await
            .expect("list_messages failed")
            .is_empty()
    );
    assert!(
        db.list_sessions("u1")
            .await
            .expect("list_sessions failed")
            .is_empty()
    );
}
