//! Error types for push handling operations

use thiserror::Error;

/// Errors raised by the push pipeline's collaborators.
///
/// None of these escape the dispatch path: handlers log them and carry on,
/// so a bad push never blocks the notification pipeline.
#[derive(Debug, Error)]
pub enum PushError {
    #[error("Call presenter is not initialized")]
    PresenterUnavailable,

    #[error("Call presenter error: {0}")]
    Presenter(String),

    #[error("Token store error: {0}")]
    TokenStore(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PushError {
    /// Build a presenter error from anything printable
    pub fn presenter(msg: impl Into<String>) -> Self {
        Self::Presenter(msg.into())
    }

    /// Build a token store error from anything printable
    pub fn token_store(msg: impl Into<String>) -> Self {
        Self::TokenStore(msg.into())
    }
}

impl From<config::ConfigError> for PushError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PushError>;
