use crate::error::{ApiErrorBody, ApiErrorObject};
use crate::server::router::MurshidState;
use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use subtle::ConstantTimeEq;

fn extract_token(headers: &axum::http::HeaderMap) -> Option<String> {
    if let Some(k) = headers.get("x-api-key").and_then(|v| v.to_str().ok()) {
        return Some(k.to_string());
    }
    headers
        .typed_get::<Authorization<Bearer>>()
        .map(|auth| auth.token().to_string())
}

/// Guard for the parental-control routes. Accepts the admin key via
/// `x-api-key` or a bearer token; comparison is constant-time.
#[derive(Debug, Clone, Copy)]
pub struct RequireAdminKey;

impl FromRequestParts<MurshidState> for RequireAdminKey {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &MurshidState,
    ) -> Result<Self, Self::Rejection> {
        let expected = state.cfg.basic.admin_key.as_str();
        if expected.trim().is_empty() {
            // Unset key locks the routes instead of opening them.
            return Err(AuthError::InvalidKey);
        }

        match extract_token(&parts.headers) {
            Some(key) => {
                if key.as_bytes().ct_eq(expected.as_bytes()).into() {
                    Ok(RequireAdminKey)
                } else {
                    Err(AuthError::InvalidKey)
                }
            }
            None => Err(AuthError::MissingKey),
        }
    }
}

pub enum AuthError {
    MissingKey,
    InvalidKey,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let message = match self {
            AuthError::MissingKey => "غير مصرح. مفتاح الإدارة مفقود.",
            AuthError::InvalidKey => "غير مصرح. مفتاح الإدارة غير صالح.",
        };
        (
            StatusCode::UNAUTHORIZED,
            Json(ApiErrorBody {
                inner: ApiErrorObject::new("UNAUTHORIZED", message),
            }),
        )
            .into_response()
    }
}
