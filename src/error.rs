//! Error types for place lookups and configuration.
//!
//! Provider errors are classified by recoverability:
//! - Retryable: network issues, timeouts, rate limits
//! - NonRetryable: bad responses, closed provider
//!
//! The resolution engine never surfaces these to callers; a failed lookup
//! degrades to "unresolved". Store failures (`DbError`) always propagate.

use std::path::PathBuf;
use thiserror::Error;

/// Failures of the external place provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    // Retryable errors
    #[error("Network error: {0}")]
    Network(String),

    #[error("Lookup timed out after {0} seconds")]
    Timeout(u64),

    #[error("Provider rate limit exceeded")]
    RateLimited,

    // Non-retryable errors
    #[error("Provider returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Failed to parse provider response: {0}")]
    Parse(String),

    #[error("Invalid provider configuration: {0}")]
    Configuration(String),

    #[error("Provider is closed")]
    Closed,
}

impl ProviderError {
    /// Returns true if retrying the same lookup later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProviderError::Network(_) | ProviderError::Timeout(_) | ProviderError::RateLimited
        )
    }
}

/// Failures loading or applying configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Home directory not found")]
    HomeDirNotFound,

    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid country suffix list: {0}")]
    CountrySuffix(#[from] regex::Error),
}
