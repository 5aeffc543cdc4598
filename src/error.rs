//! Error types for the avatar gateway

use thiserror::Error;

/// Result type alias for avatar gateway operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the avatar gateway
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Relay token negotiation error
    #[error("relay error: {0}")]
    Relay(String),

    /// Chat completion request error
    #[error("chat error: {0}")]
    Chat(String),

    /// Event-stream frame parsing error
    #[error("stream parse error: {0}")]
    StreamParse(String),

    /// Speech synthesis error
    #[error("synthesis error: {0}")]
    Synthesis(String),

    /// Media transport error
    #[error("media error: {0}")]
    Media(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
