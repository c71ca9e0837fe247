//! Error types for the coach subsystem.

use thiserror::Error;

use crate::llm::gateway::GatewayError;

/// Conversation store error type.
#[derive(Debug, Error)]
pub enum StoreError {
    /// `SQLite` storage error (sync).
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// `SQLite` storage error (async).
    #[error("tokio-rusqlite error: {0}")]
    TokioSqlite(#[from] tokio_rusqlite::Error),
    /// A stored row could not be turned back into a turn.
    #[error("invalid stored turn: {0}")]
    InvalidTurn(String),
}

/// Convenience result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Coach subsystem error type.
#[derive(Debug, Error)]
pub enum CoachError {
    /// The incoming message was blank.
    #[error("message must not be empty")]
    EmptyMessage,
    /// Neither the request nor the configuration supplied an inference credential.
    #[error("an inference API key is required (set OPENAI_API_KEY or pass api_key)")]
    MissingCredential,
    /// Invalid configuration or unsupported values.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Conversation store failure.
    #[error("conversation store error: {0}")]
    Store(#[from] StoreError),
    /// Gateway construction failure.
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),
    /// URL parse error.
    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),
    /// Regex error.
    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),
}

/// Convenience result alias for coach operations.
pub type CoachResult<T> = Result<T, CoachError>;
