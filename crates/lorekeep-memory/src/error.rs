//! Error types for the memory store.

/// Errors that can occur in memory store operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// SQLite database error
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization / deserialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Session row is missing or no longer active
    #[error("session not active: {0}")]
    SessionNotActive(String),

    /// Session row changed between read and write
    #[error("concurrent update on session {0}")]
    Conflict(String),

    /// General internal error
    #[error("{0}")]
    Internal(String),
}

/// Convenience Result type.
pub type Result<T> = std::result::Result<T, Error>;
