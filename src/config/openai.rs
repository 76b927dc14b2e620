use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use url::Url;

/// Upstream completion-API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OpenaiConfig {
    /// API key sent as a bearer token on every upstream call.
    /// TOML: `openai.api_key`. Must be provided for real deployments.
    #[serde(default)]
    #[serde(deserialize_with = "deserialize_string_lax")]
    pub api_key: String,

    /// Base URL of the OpenAI-compatible API.
    /// TOML: `openai.base_url`. Default: `https://api.openai.com`.
    #[serde(default = "default_base_url")]
    pub base_url: Url,

    /// Completion model name.
    /// TOML: `openai.model`. Default: `gpt-4o-mini`.
    #[serde(default = "default_model")]
    pub model: String,

    /// Run the moderation endpoint before the completion call.
    /// TOML: `openai.moderation`. Default: `false`.
    #[serde(default)]
    pub moderation: bool,

    /// Moderation model name.
    /// TOML: `openai.moderation_model`. Default: `omni-moderation-latest`.
    #[serde(default = "default_moderation_model")]
    pub moderation_model: String,

    /// Sampling temperature forwarded upstream when set.
    /// TOML: `openai.temperature`.
    #[serde(default)]
    pub temperature: Option<f32>,

    /// Completion token cap forwarded upstream when set.
    /// TOML: `openai.max_tokens`.
    #[serde(default)]
    pub max_tokens: Option<u32>,

    /// Optional upstream HTTP proxy for the reqwest client.
    /// TOML: `openai.proxy`. Example: `http://127.0.0.1:1080`.
    #[serde(default)]
    pub proxy: Option<Url>,

    /// Allow HTTP/2 multiplexing for the reqwest client; disabled forces HTTP/1.
    /// TOML: `openai.enable_multiplexing`. Default: `false`.
    #[serde(default)]
    pub enable_multiplexing: bool,

    /// Max retry attempts for transient upstream failures.
    /// TOML: `openai.retry_max_times`. Default: `3`.
    #[serde(default = "default_retry_max_times")]
    pub retry_max_times: usize,

    /// Whole-request timeout in seconds (covers long streams).
    /// TOML: `openai.request_timeout_secs`. Default: `600`.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for OpenaiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_base_url(),
            model: default_model(),
            moderation: false,
            moderation_model: default_moderation_model(),
            temperature: None,
            max_tokens: None,
            proxy: None,
            enable_multiplexing: false,
            retry_max_times: default_retry_max_times(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl OpenaiConfig {
    pub fn chat_url(&self) -> Url {
        self.base_url
            .join("/v1/chat/completions")
            .expect("valid chat completions URL")
    }

    pub fn moderation_url(&self) -> Url {
        self.base_url
            .join("/v1/moderations")
            .expect("valid moderations URL")
    }
}

fn deserialize_string_lax<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Value::deserialize(deserializer)?;

    match v {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(serde::de::Error::custom(
            "expected a string or a number for openai.api_key",
        )),
    }
}

fn default_base_url() -> Url {
    Url::parse("https://api.openai.com").expect("valid default base URL")
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_moderation_model() -> String {
    "omni-moderation-latest".to_string()
}

fn default_retry_max_times() -> usize {
    3
}

fn default_request_timeout_secs() -> u64 {
    600
}
