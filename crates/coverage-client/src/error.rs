//! Error types for backend fetches.

use thiserror::Error;

/// Errors that can occur while talking to a coverage backend.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport-level failure that survived the retry budget.
    #[error("request failed after {attempts} attempts: {message}")]
    Unavailable { attempts: u32, message: String },

    /// Timeout on the final attempt.
    #[error("request timed out after {attempts} attempts: {message}")]
    Timeout { attempts: u32, message: String },

    /// The backend answered with a non-retryable error status.
    #[error("backend returned {status} for {url}")]
    Status { status: u16, url: String },

    /// The backend answered 200 with a payload we cannot use.
    #[error("failed to decode backend response: {0}")]
    Decode(String),
}

impl FetchError {
    /// True when the failure was a timeout rather than a hard error.
    ///
    /// Callers map timeouts to 504 and everything else to 502.
    pub fn is_timeout(&self) -> bool {
        matches!(self, FetchError::Timeout { .. })
    }
}
