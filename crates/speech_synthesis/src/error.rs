//! Speech synthesis errors

use thiserror::Error;

/// Errors that can occur during speech synthesis
#[derive(Debug, Error)]
pub enum SynthesisError {
    /// Feature disabled or the selected backend has no credential
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Backend answered with a non-success status
    #[error("Backend returned HTTP {status}: {detail}")]
    Backend {
        /// HTTP status code
        status: u16,
        /// Provider-supplied detail (never shown to end users)
        detail: String,
    },

    /// Backend answered with a body we could not decode
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Failed to connect to the backend
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Timeout during the backend request
    #[error("Speech synthesis timeout after {0}ms")]
    Timeout(u64),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimited,

    /// Request rejected before reaching a backend
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl SynthesisError {
    /// Short, non-technical message suitable for end users
    #[must_use]
    pub const fn user_message(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "Voice playback is not configured right now.",
            Self::Backend { .. } | Self::InvalidResponse(_) => {
                "The speech service could not generate audio."
            },
            Self::ConnectionFailed(_) | Self::Timeout(_) => {
                "The speech service is not reachable at the moment."
            },
            Self::RateLimited => "The speech service is busy, please try again shortly.",
            Self::InvalidInput(_) => "There is nothing to say.",
        }
    }
}

impl From<reqwest::Error> for SynthesisError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(30000)
        } else if err.is_connect() {
            Self::ConnectionFailed(err.to_string())
        } else if err.is_decode() {
            Self::InvalidResponse(err.to_string())
        } else {
            Self::ConnectionFailed(err.to_string())
        }
    }
}
