//! Service-level errors

use speech_synthesis::SynthesisError;
use thiserror::Error;
use voice_delivery::DeliveryError;

/// Errors that can occur in the voice service
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Speech could not be synthesized
    #[error(transparent)]
    Synthesis(#[from] SynthesisError),

    /// Audio could not be delivered
    #[error(transparent)]
    Delivery(#[from] DeliveryError),

    /// Reading or writing a local file failed
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// A document could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ServiceError {
    /// Short, non-technical message suitable for end users
    #[must_use]
    pub const fn user_message(&self) -> &'static str {
        match self {
            Self::Synthesis(err) => err.user_message(),
            Self::Delivery(err) => err.user_message(),
            Self::Storage(_) | Self::Serialization(_) => "Could not save the voice debug files.",
        }
    }
}
