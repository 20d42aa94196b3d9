//! Error types for lorekeep-llm

use thiserror::Error;

/// LLM error type
#[derive(Debug, Error)]
pub enum Error {
    /// Provider not configured
    #[error("provider not configured: {0}")]
    NotConfigured(String),

    /// Provider selector that names no known backend
    #[error("unsupported provider: {0}")]
    UnsupportedProvider(String),

    /// API error
    #[error("api error: {0}")]
    Api(String),

    /// Rate limit exceeded
    #[error("rate limit exceeded")]
    RateLimit,

    /// Invalid response
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Network error
    #[error("network error: {0}")]
    Network(String),

    /// Timeout
    #[error("timeout after {0}ms")]
    Timeout(u64),

    /// Provider kept reporting truncation past the continuation bound
    #[error("reply still truncated after {0} continuation rounds")]
    ContinuationLimit(u32),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
