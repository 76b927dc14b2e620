use axum::{Json, http::StatusCode, response::IntoResponse};
use murshid_schema::OpenaiErrorObject;
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum MurshidError {
    #[error("empty message")]
    EmptyMessage,

    #[error("message too long: {0} chars")]
    MessageTooLong(usize),

    #[error("invalid request body: {0}")]
    BadRequestBody(String),

    #[error("rate limit exceeded; retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("daily message limit reached ({limit})")]
    DailyLimitReached { limit: i64 },

    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("Upstream error with status: {0}")]
    UpstreamStatus(StatusCode),

    #[error("Upstream API error ({status}): {}", body.message)]
    UpstreamApi {
        status: StatusCode,
        body: OpenaiErrorObject,
    },

    #[error("Empty completion from upstream")]
    EmptyCompletion,

    #[error("HTTP request error: {0}")]
    ReqwestError(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Stream protocol error: {0}")]
    StreamProtocolError(String),

    #[error("Ractor error: {0}")]
    RactorError(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

// User-facing strings are Arabic; the `code` field stays machine-readable.
const MSG_EMPTY: &str = "الرسالة فارغة. يرجى كتابة سؤالك.";
const MSG_TOO_LONG: &str = "الرسالة طويلة جداً. الحد الأقصى 4000 حرف.";
const MSG_BAD_REQUEST: &str = "طلب غير صالح. تحقق من البيانات المرسلة.";
const MSG_RATE_LIMIT: &str = "عدد كبير من الطلبات. يرجى المحاولة بعد قليل.";
const MSG_DAILY_LIMIT: &str = "تم الوصول إلى الحد اليومي للرسائل. حاول مجدداً غداً.";
const MSG_SESSION_NOT_FOUND: &str = "الجلسة غير موجودة.";
const MSG_UPSTREAM: &str = "عذراً، حدث خطأ أثناء الاتصال بالخدمة. حاول مرة أخرى لاحقاً.";
const MSG_INTERNAL: &str = "عذراً، حدث خطأ في الخادم. حاول مرة أخرى لاحقاً.";

impl IntoResponse for MurshidError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_body) = match self {
            MurshidError::EmptyMessage => (
                StatusCode::BAD_REQUEST,
                ApiErrorObject::new("EMPTY_MESSAGE", MSG_EMPTY),
            ),

            MurshidError::MessageTooLong(len) => (
                StatusCode::BAD_REQUEST,
                ApiErrorObject::new("MESSAGE_TOO_LONG", MSG_TOO_LONG)
                    .with_details(json!({ "length": len })),
            ),

            MurshidError::BadRequestBody(_) => (
                StatusCode::BAD_REQUEST,
                ApiErrorObject::new("BAD_REQUEST", MSG_BAD_REQUEST),
            ),

            MurshidError::RateLimited { retry_after_secs } => (
                StatusCode::TOO_MANY_REQUESTS,
                ApiErrorObject::new("RATE_LIMIT", MSG_RATE_LIMIT)
                    .with_details(json!({ "retryAfterSecs": retry_after_secs })),
            ),

            MurshidError::DailyLimitReached { limit } => (
                StatusCode::TOO_MANY_REQUESTS,
                ApiErrorObject::new("DAILY_LIMIT", MSG_DAILY_LIMIT)
                    .with_details(json!({ "dailyMessageLimit": limit })),
            ),

            MurshidError::SessionNotFound(_) => (
                StatusCode::NOT_FOUND,
                ApiErrorObject::new("SESSION_NOT_FOUND", MSG_SESSION_NOT_FOUND),
            ),

            // Upstream/database failures map to a generic 500 with a static
            // fallback message; the detail stays in the logs.
            MurshidError::UpstreamStatus(_)
            | MurshidError::UpstreamApi { .. }
            | MurshidError::EmptyCompletion
            | MurshidError::ReqwestError(_)
            | MurshidError::JsonError(_)
            | MurshidError::StreamProtocolError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiErrorObject::new("UPSTREAM_ERROR", MSG_UPSTREAM),
            ),

            MurshidError::RactorError(_) | MurshidError::DatabaseError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiErrorObject::new("INTERNAL_ERROR", MSG_INTERNAL),
            ),
        };
        (status, Json(ApiErrorBody { inner: error_body })).into_response()
    }
}

/// Standardized API error response payload.
#[derive(Serialize)]
pub struct ApiErrorObject {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ApiErrorObject {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

#[derive(Serialize)]
pub struct ApiErrorBody {
    #[serde(rename = "error")]
    pub inner: ApiErrorObject,
}

pub trait IsRetryable {
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for MurshidError {
    fn is_retryable(&self) -> bool {
        match self {
            MurshidError::ReqwestError(_) => true,
            MurshidError::UpstreamStatus(status) | MurshidError::UpstreamApi { status, .. } => {
                matches!(
                    *status,
                    StatusCode::TOO_MANY_REQUESTS
                        | StatusCode::INTERNAL_SERVER_ERROR
                        | StatusCode::BAD_GATEWAY
                        | StatusCode::SERVICE_UNAVAILABLE
                )
            }
            _ => false,
        }
    }
}
