//! Error types shared across the pipeline

use thiserror::Error;

/// Store-layer failure, surfaced to callers so they can apply their
/// bounded retry-then-skip policy.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Write rejected or lost by the backing store
    #[error("store write failed for {key}: {reason}")]
    WriteFailed { key: String, reason: String },

    /// Record not present
    #[error("record not found: {0}")]
    NotFound(String),

    /// Record could not be serialized for storage
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Invalid configuration detected at startup.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Feature weights must sum to 1
    #[error("feature weights sum to {sum}, expected 1.0")]
    WeightSum { sum: f64 },

    /// A numeric setting is outside its valid range
    #[error("invalid setting {name}: {reason}")]
    InvalidSetting { name: &'static str, reason: String },
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
