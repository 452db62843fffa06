//! Error types shared across the capability seams.

use thiserror::Error;

/// Errors surfaced by [`crate::traits::GraphStore`] implementations.
#[derive(Debug, Error)]
pub enum GraphStoreError {
    #[error("uniqueness constraint violated: {0}")]
    ConstraintViolation(String),
    #[error("node not found: {0}")]
    NotFound(String),
    #[error("transaction failed: {0}")]
    Transaction(String),
    #[error("store configuration error: {0}")]
    Config(String),
    #[error("store i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Extraction adapter failure. Caught per document; never aborts a run.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("adapter '{adapter}' failed: {message}")]
    Adapter { adapter: String, message: String },
    #[error("unknown adapter: {0}")]
    UnknownAdapter(String),
}

/// The classifier could not be constructed at all (distinct from a failed
/// call): disabled, no provider configured, or every provider in the chain
/// failed to initialize.
#[derive(Debug, Clone, Error)]
#[error("classifier unavailable: {reason}")]
pub struct ClassifierUnavailable {
    pub reason: String,
}

impl ClassifierUnavailable {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

/// A single classification call failed. Counted by the caller; resolution
/// degrades to a fallback decision instead of propagating.
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("http error: {0}")]
    Http(String),
    #[error("rate limited: {0}")]
    RateLimited(String),
    #[error("service unavailable: {0}")]
    Unavailable(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("retries exhausted after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: String },
}

impl ClassifierError {
    /// Rate-limit and availability errors are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited(_) | Self::Unavailable(_))
    }
}

/// Embedding provider failure.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("http error: {0}")]
    Http(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("embedding configuration error: {0}")]
    Config(String),
}
