//! Error types for provider invocation.

use std::time::Duration;

use thiserror::Error;

/// Coarse failure class used by the invocation engine.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FailureClass {
    /// Rate limit or resource exhaustion.
    Transient,
    /// The response could not be used as structured output.
    Malformed,
    /// Invalid or unauthorized credential.
    Fatal,
    /// Network failures, timeouts and anything unclassified.
    Other,
}

impl FailureClass {
    /// Stable label for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Transient => "transient",
            Self::Malformed => "malformed",
            Self::Fatal => "fatal",
            Self::Other => "other",
        }
    }
}

/// Errors from a single provider call.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Quota or rate limit hit.
    #[error("rate limited (HTTP {status}): {message}")]
    RateLimited {
        /// HTTP status code.
        status: u16,
        /// Provider message.
        message: String,
    },
    /// The credential was rejected.
    #[error("credential rejected (HTTP {status}): {message}")]
    Unauthorized {
        /// HTTP status code.
        status: u16,
        /// Provider message.
        message: String,
    },
    /// Any other non-success status.
    #[error("provider returned HTTP {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Provider message.
        message: String,
    },
    /// The response body or candidate text is unusable.
    #[error("malformed provider output: {0}")]
    Malformed(String),
    /// The call exceeded its time budget.
    #[error("provider call timed out after {0:?}")]
    Timeout(Duration),
    /// Transport-level failure.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
}

impl ProviderError {
    /// Classify this error.
    #[must_use]
    pub const fn class(&self) -> FailureClass {
        match self {
            Self::RateLimited { .. } => FailureClass::Transient,
            Self::Unauthorized { .. } => FailureClass::Fatal,
            Self::Malformed(_) => FailureClass::Malformed,
            Self::Status { .. } | Self::Timeout(_) | Self::Http(_) => FailureClass::Other,
        }
    }

    /// Check if this error is a quota or rate-limit condition.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self.class(), FailureClass::Transient)
    }
}

/// One failed attempt, recorded with a masked credential.
#[derive(Clone, Debug)]
pub struct AttemptFailure {
    /// Masked credential hint.
    pub credential: String,
    /// Failure class.
    pub class: FailureClass,
    /// Error message.
    pub message: String,
}

/// Errors returned by the invocation engine.
#[derive(Debug, Error)]
pub enum InvocationError {
    /// The pool is empty.
    #[error("no credentials")]
    NoCredentials,
    /// Every credential failed for this request.
    #[error("all {} credentials failed: {}", .failures.len(), summarize(.failures))]
    Exhausted {
        /// One entry per attempted credential, in attempt order.
        failures: Vec<AttemptFailure>,
    },
}

fn summarize(failures: &[AttemptFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{}={}", f.credential, f.class.as_str()))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let quota = ProviderError::RateLimited {
            status: 429,
            message: "RESOURCE_EXHAUSTED".to_string(),
        };
        assert_eq!(quota.class(), FailureClass::Transient);
        assert!(quota.is_transient());

        let bad_key = ProviderError::Unauthorized {
            status: 400,
            message: "API_KEY_INVALID".to_string(),
        };
        assert_eq!(bad_key.class(), FailureClass::Fatal);
        assert_eq!(
            ProviderError::Malformed("x".to_string()).class(),
            FailureClass::Malformed
        );
        assert_eq!(
            ProviderError::Timeout(Duration::from_secs(1)).class(),
            FailureClass::Other
        );
    }

    #[test]
    fn test_exhausted_message_lists_attempts() {
        let err = InvocationError::Exhausted {
            failures: vec![
                AttemptFailure {
                    credential: "AIza…aaaa".to_string(),
                    class: FailureClass::Transient,
                    message: "429".to_string(),
                },
                AttemptFailure {
                    credential: "AIza…bbbb".to_string(),
                    class: FailureClass::Fatal,
                    message: "403".to_string(),
                },
            ],
        };
        assert_eq!(
            err.to_string(),
            "all 2 credentials failed: AIza…aaaa=transient, AIza…bbbb=fatal"
        );
    }
}
