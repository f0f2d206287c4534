//! Voice delivery errors

use std::fmt;
use std::time::Duration;

use speech_synthesis::SynthesisError;
use thiserror::Error;

/// Failures reported by the real-time transport
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Connection is gone and cannot be reused
    #[error("Voice connection disconnected")]
    Disconnected,

    /// Transport refused an operation; the connection may still be usable
    #[error("Transport rejected the request: {0}")]
    Rejected(String),

    /// Player could not be attached to the connection
    #[error("Failed to subscribe player: {0}")]
    Subscription(String),
}

impl TransportError {
    /// Whether the connection must be discarded
    #[must_use]
    pub const fn is_unrecoverable(&self) -> bool {
        matches!(self, Self::Disconnected)
    }
}

/// Failures of the per-key scheduler itself, never of the scheduled task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SchedulerError {
    /// The task panicked; successors still run
    #[error("Playback task panicked")]
    TaskPanicked,

    /// The task was dropped before completing (runtime shutdown)
    #[error("Playback task was cancelled")]
    Cancelled,
}

/// Bounded wait that expired
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitStage {
    /// Connection ready confirmation
    Ready,
    /// Player reported playback start
    Started,
    /// Player reported playback end
    Finished,
    /// Silence flush start
    DrainStarted,
    /// Silence flush end
    DrainFinished,
}

impl fmt::Display for WaitStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ready => "connection ready",
            Self::Started => "playback start",
            Self::Finished => "playback finish",
            Self::DrainStarted => "silence flush start",
            Self::DrainFinished => "silence flush finish",
        };
        f.write_str(name)
    }
}

/// Errors that abort a single delivery task
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// Audio could not be produced
    #[error(transparent)]
    Synthesis(#[from] SynthesisError),

    /// Audio could not be converted to the streaming codec
    #[error("Transcoding failed: {0}")]
    Transcode(String),

    /// A bounded transport wait expired
    #[error("Timed out waiting for {stage} after {after:?}")]
    TransportTimeout {
        /// Which wait expired
        stage: WaitStage,
        /// Configured bound
        after: Duration,
    },

    /// Player could not be subscribed; the connection was destroyed
    #[error("Subscription failed: {0}")]
    Subscription(String),

    /// Other transport failure
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Scheduler could not complete the task
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}

impl DeliveryError {
    /// Short, non-technical message suitable for end users
    #[must_use]
    pub const fn user_message(&self) -> &'static str {
        match self {
            Self::Synthesis(err) => err.user_message(),
            Self::Transcode(_) => "The generated audio could not be prepared for playback.",
            Self::TransportTimeout {
                stage: WaitStage::Ready,
                ..
            } => "Could not connect to the voice channel in time.",
            Self::TransportTimeout { .. } => "Playback did not complete in time.",
            Self::Subscription(_) | Self::Transport(_) => {
                "Lost the connection to the voice channel."
            },
            Self::Scheduler(_) => "Playback was interrupted.",
        }
    }

    /// Whether the session's connection must be discarded
    #[must_use]
    pub const fn is_unrecoverable(&self) -> bool {
        match self {
            Self::Transport(err) => err.is_unrecoverable(),
            Self::Subscription(_) => true,
            _ => false,
        }
    }
}
