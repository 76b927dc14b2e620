use crate::config::OpenaiConfig;
use crate::error::{IsRetryable, MurshidError};
use backon::{ExponentialBuilder, Retryable};
use murshid_schema::{
    ChatCompletionRequest, ChatMessage, ModerationRequest, ModerationResponse, OpenaiErrorBody,
};
use reqwest::header::AUTHORIZATION;
use std::time::Duration;
use tracing::{error, warn};
use url::Url;

/// Thin caller for the OpenAI-style completion and moderation endpoints.
///
/// Transient upstream failures are retried with jittered exponential
/// backoff; everything else surfaces to the handler as `MurshidError`.
pub struct OpenAiClient {
    client: reqwest::Client,
    chat_url: Url,
    moderation_url: Url,
    api_key: String,
    model: String,
    moderation_model: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    retry_policy: ExponentialBuilder,
}

impl OpenAiClient {
    pub fn new(cfg: &OpenaiConfig, client: reqwest::Client) -> Self {
        let retry_policy = ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(100))
            .with_max_delay(Duration::from_millis(300))
            .with_max_times(cfg.retry_max_times)
            .with_jitter();

        Self {
            client,
            chat_url: cfg.chat_url(),
            moderation_url: cfg.moderation_url(),
            api_key: cfg.api_key.clone(),
            model: cfg.model.clone(),
            moderation_model: cfg.moderation_model.clone(),
            temperature: cfg.temperature,
            max_tokens: cfg.max_tokens,
            retry_policy,
        }
    }

    /// POSTs a completion request and returns the raw upstream response
    /// (body still unread, so the caller can consume it as JSON or SSE).
    pub async fn chat_completion(
        &self,
        messages: Vec<ChatMessage>,
        stream: bool,
    ) -> Result<reqwest::Response, MurshidError> {
        let mut payload = ChatCompletionRequest::new(self.model.clone(), messages);
        payload.stream = stream;
        payload.temperature = self.temperature;
        payload.max_tokens = self.max_tokens;

        let op = || async {
            let resp = self
                .client
                .post(self.chat_url.clone())
                .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
                .json(&payload)
                .send()
                .await?;

            if !resp.status().is_success() {
                return Err(upstream_error(resp).await);
            }
            Ok(resp)
        };

        op.retry(&self.retry_policy)
            .when(IsRetryable::is_retryable)
            .notify(|err: &MurshidError, dur: Duration| {
                error!("Completion retrying after error {err}, sleeping {dur:?}");
            })
            .await
    }

    /// Runs the moderation endpoint; `true` means the input was flagged.
    pub async fn moderate(&self, input: &str) -> Result<bool, MurshidError> {
        let payload = ModerationRequest {
            input: input.to_string(),
            model: Some(self.moderation_model.clone()),
        };

        let resp = self
            .client
            .post(self.moderation_url.clone())
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .json(&payload)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(upstream_error(resp).await);
        }

        let body = resp.json::<ModerationResponse>().await?;
        Ok(body.flagged())
    }
}

/// Folds a non-2xx upstream response into a `MurshidError`, preferring the
/// structured error body when one parses.
async fn upstream_error(resp: reqwest::Response) -> MurshidError {
    let status = resp.status();
    let bytes = match resp.bytes().await {
        Ok(b) => b,
        Err(e) => return MurshidError::ReqwestError(e),
    };

    if let Ok(parsed) = serde_json::from_slice::<OpenaiErrorBody>(&bytes) {
        warn!(
            status = %status,
            kind = parsed.error.kind.as_deref().unwrap_or("-"),
            message = %parsed.error.message,
            "Upstream returned structured error"
        );
        MurshidError::UpstreamApi {
            status,
            body: parsed.error,
        }
    } else {
        let raw_body = String::from_utf8_lossy(&bytes);
        warn!("Upstream non-JSON error. Status: {}, Body: {:.100}", status, raw_body);
        MurshidError::UpstreamStatus(status)
    }
}
