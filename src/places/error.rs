//! Error types for place lookups.

use thiserror::Error;

/// Errors that can occur while querying the places backend.
#[derive(Debug, Error)]
pub enum PlacesError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// Response body was not the expected JSON.
    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Backend answered with a non-success status.
    #[error("places backend returned HTTP {0}")]
    Status(u16),

    /// Backend reported an error in its body.
    #[error("places backend error: {0}")]
    Backend(String),

    /// API key required but not configured.
    #[error("API key required for {0}")]
    ApiKeyRequired(String),
}

impl PlacesError {
    /// Whether the feature is simply not configured.
    #[must_use]
    pub const fn is_unconfigured(&self) -> bool {
        matches!(self, Self::ApiKeyRequired(_))
    }
}

/// Result alias for place lookups.
pub type PlacesResult<T> = Result<T, PlacesError>;
