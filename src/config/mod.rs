mod basic;
mod limits;
mod openai;
mod tutor;

pub use basic::BasicConfig;
pub use limits::LimitsConfig;
pub use openai::OpenaiConfig;
pub use tutor::{DEFAULT_REFUSAL_REPLY, DEFAULT_SYSTEM_PROMPT, TutorConfig};

use figment::{
    Figment,
    providers::{Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Application configuration managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Core server configuration (see `basic` table in config.toml).
    #[serde(default)]
    pub basic: BasicConfig,

    /// Upstream completion-API settings (see `openai` table in config.toml).
    #[serde(default)]
    pub openai: OpenaiConfig,

    /// Admission limits (see `limits` table in config.toml).
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Tutor persona settings (see `tutor` table in config.toml).
    #[serde(default)]
    pub tutor: TutorConfig,
}

const DEFAULT_CONFIG_FILE: &str = "config.toml";

impl Config {
    /// Builds a Figment that merges defaults and a config TOML file.
    pub fn figment() -> Figment {
        let figment = Figment::new().merge(Serialized::defaults(Config::default()));
        if PathBuf::from(DEFAULT_CONFIG_FILE).is_file() {
            figment.merge(Toml::file(DEFAULT_CONFIG_FILE))
        } else {
            figment
        }
    }

    /// Loads configuration from the TOML file (with defaults) and validates required fields.
    pub fn from_toml() -> Self {
        if !PathBuf::from(DEFAULT_CONFIG_FILE).is_file() {
            panic!("config file not found: {DEFAULT_CONFIG_FILE}");
        }
        let cfg: Self = Self::figment().extract().unwrap_or_else(|err| {
            panic!("failed to extract configuration from {DEFAULT_CONFIG_FILE}: {err}")
        });
        if cfg.openai.api_key.trim().is_empty() {
            panic!("openai.api_key must be set and non-empty");
        }
        if cfg.basic.admin_key.trim().is_empty() {
            panic!("basic.admin_key must be set and non-empty");
        }
        cfg
    }
}
