//! Error types for lorekeep-core
//!
//! Every engine failure falls into one of five kinds. A calling boundary
//! maps [`ErrorKind`] to its own status codes without matching on payloads.

use thiserror::Error;

/// Coarse classification of an engine error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Caller sent malformed input
    Validation,
    /// Session is unknown or already ended
    NotFound,
    /// Generation backend failed
    Provider,
    /// Persistence failed
    Storage,
    /// Session data is structurally inconsistent
    InvalidState,
}

/// Core error type
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed identifier, empty participant list or unknown selector
    #[error("validation error: {0}")]
    Validation(String),

    /// No active session with this ID
    #[error("session not found: {0}")]
    NotFound(String),

    /// LLM provider error
    #[error("provider error: {0}")]
    Provider(#[from] lorekeep_llm::Error),

    /// Storage error
    #[error("storage error: {0}")]
    Storage(lorekeep_memory::Error),

    /// Session cannot be driven as stored
    #[error("invalid session state: {0}")]
    InvalidState(String),
}

impl Error {
    /// Classify this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(_) => ErrorKind::Validation,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::Provider(_) => ErrorKind::Provider,
            Error::Storage(_) => ErrorKind::Storage,
            Error::InvalidState(_) => ErrorKind::InvalidState,
        }
    }
}

impl From<lorekeep_memory::Error> for Error {
    fn from(err: lorekeep_memory::Error) -> Self {
        match err {
            // A conditional write that found no active row lost the race to an end
            lorekeep_memory::Error::SessionNotActive(id) => Error::NotFound(id),
            other => Error::Storage(other),
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
