//! Configuration for voice delivery

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Bounds on every transport wait plus the silence flush length
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// Time allowed for a join to produce a ready connection
    #[serde(default = "default_ready_timeout_ms")]
    pub ready_timeout_ms: u64,

    /// Time allowed for converting a clip into the stream codec
    #[serde(default = "default_transcode_timeout_ms")]
    pub transcode_timeout_ms: u64,

    /// Time allowed for playback to start
    #[serde(default = "default_start_timeout_ms")]
    pub start_timeout_ms: u64,

    /// Time allowed for playback to finish
    #[serde(default = "default_finish_timeout_ms")]
    pub finish_timeout_ms: u64,

    #[serde(default = "default_drain_start_timeout_ms")]
    pub drain_start_timeout_ms: u64,

    #[serde(default = "default_drain_finish_timeout_ms")]
    pub drain_finish_timeout_ms: u64,

    /// Silence frames played after each clip; 0 disables the flush
    #[serde(default = "default_silence_frames")]
    pub silence_frames: usize,
}

const fn default_ready_timeout_ms() -> u64 {
    30_000
}

const fn default_transcode_timeout_ms() -> u64 {
    30_000
}

const fn default_start_timeout_ms() -> u64 {
    5_000
}

const fn default_finish_timeout_ms() -> u64 {
    120_000
}

const fn default_drain_start_timeout_ms() -> u64 {
    1_000
}

const fn default_drain_finish_timeout_ms() -> u64 {
    2_000
}

const fn default_silence_frames() -> usize {
    5
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            ready_timeout_ms: default_ready_timeout_ms(),
            transcode_timeout_ms: default_transcode_timeout_ms(),
            start_timeout_ms: default_start_timeout_ms(),
            finish_timeout_ms: default_finish_timeout_ms(),
            drain_start_timeout_ms: default_drain_start_timeout_ms(),
            drain_finish_timeout_ms: default_drain_finish_timeout_ms(),
            silence_frames: default_silence_frames(),
        }
    }
}

impl DeliveryConfig {
    #[must_use]
    pub const fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_ms)
    }

    #[must_use]
    pub const fn transcode_timeout(&self) -> Duration {
        Duration::from_millis(self.transcode_timeout_ms)
    }

    #[must_use]
    pub const fn start_timeout(&self) -> Duration {
        Duration::from_millis(self.start_timeout_ms)
    }

    #[must_use]
    pub const fn finish_timeout(&self) -> Duration {
        Duration::from_millis(self.finish_timeout_ms)
    }

    #[must_use]
    pub const fn drain_start_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_start_timeout_ms)
    }

    #[must_use]
    pub const fn drain_finish_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_finish_timeout_ms)
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error naming the first zero timeout.
    pub fn validate(&self) -> Result<(), String> {
        let bounds = [
            ("ready_timeout_ms", self.ready_timeout_ms),
            ("transcode_timeout_ms", self.transcode_timeout_ms),
            ("start_timeout_ms", self.start_timeout_ms),
            ("finish_timeout_ms", self.finish_timeout_ms),
            ("drain_start_timeout_ms", self.drain_start_timeout_ms),
            ("drain_finish_timeout_ms", self.drain_finish_timeout_ms),
        ];
        for (name, value) in bounds {
            if value == 0 {
                return Err(format!("{name} must be greater than 0"));
            }
        }
        Ok(())
    }
}
