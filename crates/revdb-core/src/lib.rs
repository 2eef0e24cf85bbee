//! Shared domain types and configuration for the review collector.

mod app_config;
mod config;
pub mod keyword;
pub mod sentiment;

use thiserror::Error;

pub use app_config::{AppConfig, CollectorSettings, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use keyword::{normalize_keyword, KeywordError, MAX_KEYWORD_LEN};
pub use sentiment::{SentimentCategory, MAX_SCORE, MIN_SCORE};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required env var: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
