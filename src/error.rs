//! Domain failures that callers need to tell apart.
//!
//! Everything is still propagated as `anyhow::Error`; these variants are raised
//! with `.into()` so a caller can `downcast_ref::<CompanionError>()` to decide
//! between "not found", "rejected input" and "upstream trouble".

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompanionError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{message}")]
    Validation {
        message: String,
        warnings: Vec<String>,
    },
    #[error("この場所はまだ解放されていません。必要な親密度: {required}")]
    LocationLocked { required: u8 },
    #[error("rate limited by {provider}")]
    RateLimited { provider: String },
    #[error("{provider} returned HTTP {status}: {body}")]
    Upstream {
        provider: String,
        status: u16,
        body: String,
    },
    #[error("{0}")]
    Timeout(String),
}

impl CompanionError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            warnings: Vec::new(),
        }
    }

    /// True for failures worth retrying with backoff.
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}

/// Classify an `anyhow::Error` as a rate limit.
pub fn is_rate_limited(err: &anyhow::Error) -> bool {
    err.downcast_ref::<CompanionError>()
        .is_some_and(CompanionError::is_rate_limit)
}
