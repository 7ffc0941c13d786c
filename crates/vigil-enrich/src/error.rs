//! Provider error types
//!
//! Provider failures never fail an enrichment pass. Every variant is
//! caught at the orchestrator boundary, logged, and converted into
//! "no contribution from this provider".

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    /// Provider is configured off or missing its API key
    #[error("provider disabled")]
    Disabled,

    /// Rate budget for the current window is exhausted
    #[error("rate limit exhausted, retry in {retry_after:?}")]
    RateLimited { retry_after: std::time::Duration },

    /// Connection or transfer failure
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Upstream answered with a non-success status
    #[error("unexpected HTTP status {0}")]
    Status(u16),

    /// Response body did not have the expected shape
    #[error("malformed response: {0}")]
    Malformed(String),
}

pub type ProviderResult<T> = Result<T, ProviderError>;
