//! Error types for the collection pipeline.
//!
//! None of these escape the scheduler loop: fetch errors trigger the fallback
//! generator and publish errors are logged before the reading is dropped.

use std::time::Duration;
use thiserror::Error;

/// Configuration problems.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A key-based weather source was selected without an API key
    #[error("{provider} requires an API key (set {env_var})")]
    MissingApiKey {
        provider: &'static str,
        env_var: &'static str,
    },

    /// Configuration file not found or unreadable
    #[error("IO error: {0}")]
    Io(String),

    /// Failed to parse configuration YAML
    #[error("Parse error: {0}")]
    Parse(String),
}

/// A single fetch attempt failed, or the source is misconfigured.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("format error: {0}")]
    Format(String),
}

impl FetchError {
    /// Whether another attempt could succeed. Configuration errors are final.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, FetchError::Config(_))
    }
}

/// Publishing a reading to the broker failed.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("AMQP error: {0}")]
    Amqp(#[from] lapin::Error),

    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),

    #[error("broker did not answer within {0:?}")]
    Timeout(Duration),

    #[error("broker rejected the message")]
    Nacked,

    #[error("broker error: {0}")]
    Broker(String),
}
