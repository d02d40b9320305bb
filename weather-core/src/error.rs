//! Failure taxonomy shared by every layer of the fetch pipeline.

use thiserror::Error;

/// Message used when a failure cannot be attributed to anything more specific.
pub const UNKNOWN_ERROR_MESSAGE: &str = "Unknown error occurred";

/// Why a weather lookup failed.
///
/// Every failure surfaced by a source, the retry layer or the cache is one of
/// these three variants, so callers can match exhaustively.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// No response was received: connection refused, DNS failure, reset.
    #[error("network error: {message}")]
    Network { message: String },

    /// The remote answered but rejected the request or sent an unusable payload.
    #[error("API error (status {status_code}): {message}")]
    Api { status_code: u16, message: String },

    /// The overall time budget for the lookup was exhausted.
    #[error("timeout: {message}")]
    Timeout { message: String },
}

impl FetchError {
    pub fn network(message: impl Into<String>) -> Self {
        FetchError::Network {
            message: message.into(),
        }
    }

    pub fn api(status_code: u16, message: impl Into<String>) -> Self {
        FetchError::Api {
            status_code,
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        FetchError::Timeout {
            message: message.into(),
        }
    }

    /// Coercion target for failures that carry no usable classification.
    pub fn unknown() -> Self {
        FetchError::network(UNKNOWN_ERROR_MESSAGE)
    }

    /// Network and API failures may be retried; a timeout already spent the budget.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Network { .. } | FetchError::Api { .. } => true,
            FetchError::Timeout { .. } => false,
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            FetchError::Api { status_code, .. } => Some(*status_code),
            FetchError::Network { .. } | FetchError::Timeout { .. } => None,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            FetchError::Network { message }
            | FetchError::Api { message, .. }
            | FetchError::Timeout { message } => message,
        }
    }
}

/// Classifies a transport error by whether a response was actually received.
impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => FetchError::api(status.as_u16(), err.to_string()),
            None => FetchError::network(err.to_string()),
        }
    }
}

/// A policy or cache setting outside its allowed range.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    #[error("{field} must be greater than zero")]
    NonPositive { field: &'static str },
}
