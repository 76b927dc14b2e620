use serde::{Deserialize, Serialize};

/// Request admission limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LimitsConfig {
    /// Maximum accepted chat message length in characters.
    /// TOML: `limits.max_message_chars`. Default: `4000`.
    #[serde(default = "default_max_message_chars")]
    pub max_message_chars: usize,

    /// Sliding rate window length in seconds.
    /// TOML: `limits.rate_window_secs`. Default: `60`.
    #[serde(default = "default_rate_window_secs")]
    pub rate_window_secs: u64,

    /// Requests allowed per client IP within one window.
    /// TOML: `limits.rate_max_requests`. Default: `20`.
    #[serde(default = "default_rate_max_requests")]
    pub rate_max_requests: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_message_chars: default_max_message_chars(),
            rate_window_secs: default_rate_window_secs(),
            rate_max_requests: default_rate_max_requests(),
        }
    }
}

fn default_max_message_chars() -> usize {
    4000
}

fn default_rate_window_secs() -> u64 {
    60
}

fn default_rate_max_requests() -> usize {
    20
}
