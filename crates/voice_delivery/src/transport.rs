//! Real-time voice transport ports
//!
//! The voice SDK itself lives outside this crate. These traits describe the
//! handful of operations delivery needs from it, with every asynchronous
//! state change exposed as an explicit wait.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use speech_synthesis::AudioFormat;

use crate::error::TransportError;

/// Near-silent Opus frame used to flush the transport's buffer
pub const SILENCE_FRAME: [u8; 3] = [0xF8, 0xFF, 0xFE];

/// Organizational unit that owns voice channels (a guild or server)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub u64);

/// Voice channel within a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(pub u64);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where audio is delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Destination {
    pub group: GroupId,
    pub channel: ChannelId,
}

impl Destination {
    #[must_use]
    pub const fn new(group: GroupId, channel: ChannelId) -> Self {
        Self { group, channel }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.group, self.channel)
    }
}

/// Audio handed to a player
#[derive(Clone, PartialEq, Eq)]
pub enum PlaybackSource {
    /// Container the transport demuxes itself
    Encoded { data: Bytes, format: AudioFormat },
    /// Pre-encoded Opus frames sent as-is
    Frames(Vec<Bytes>),
}

impl PlaybackSource {
    /// `count` copies of [`SILENCE_FRAME`]
    #[must_use]
    pub fn silence(count: usize) -> Self {
        let frame = Bytes::from_static(&SILENCE_FRAME);
        Self::Frames(vec![frame; count])
    }

    /// Total payload size in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Encoded { data, .. } => data.len(),
            Self::Frames(frames) => frames.iter().map(Bytes::len).sum(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for PlaybackSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Encoded { data, format } => f
                .debug_struct("Encoded")
                .field("format", format)
                .field("bytes", &data.len())
                .finish(),
            Self::Frames(frames) => f.debug_tuple("Frames").field(&frames.len()).finish(),
        }
    }
}

/// Entry point into the voice SDK
#[async_trait]
pub trait VoiceTransport: Send + Sync {
    /// Open a connection to `destination`; it is not usable before
    /// [`VoiceConnection::wait_ready`] succeeds
    async fn join(&self, destination: &Destination)
    -> Result<Arc<dyn VoiceConnection>, TransportError>;

    /// Create a fresh, idle player
    fn create_player(&self) -> Arc<dyn AudioPlayer>;
}

/// One live connection to a voice channel
#[async_trait]
pub trait VoiceConnection: Send + Sync {
    /// Channel this connection is bound to
    fn channel(&self) -> ChannelId;

    /// Resolve once the connection can carry audio
    async fn wait_ready(&self) -> Result<(), TransportError>;

    /// Route `player` output into this connection
    fn subscribe(&self, player: Arc<dyn AudioPlayer>) -> Result<(), TransportError>;

    /// Detach the current player, if any
    fn unsubscribe(&self);

    /// Tear the connection down; waits bound to it fail afterwards
    fn destroy(&self);

    fn is_destroyed(&self) -> bool;
}

/// Plays one source at a time
#[async_trait]
pub trait AudioPlayer: Send + Sync {
    /// Start playing `source`, replacing anything queued
    fn play(&self, source: PlaybackSource) -> Result<(), TransportError>;

    /// Resolve once the current source produces audio
    async fn wait_started(&self) -> Result<(), TransportError>;

    /// Resolve once the current source has been fully played
    async fn wait_finished(&self) -> Result<(), TransportError>;

    fn stop(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_is_repeated_three_byte_frames() {
        let source = PlaybackSource::silence(5);
        match &source {
            PlaybackSource::Frames(frames) => {
                assert_eq!(frames.len(), 5);
                assert!(frames.iter().all(|f| f[..] == SILENCE_FRAME));
            },
            PlaybackSource::Encoded { .. } => panic!("expected frames"),
        }
        assert_eq!(source.len(), 15);
    }

    #[test]
    fn zero_silence_frames_is_empty() {
        assert!(PlaybackSource::silence(0).is_empty());
    }

    #[test]
    fn destination_display() {
        let dest = Destination::new(GroupId(10), ChannelId(20));
        assert_eq!(dest.to_string(), "10/20");
    }

    #[test]
    fn ids_serialize_as_plain_numbers() {
        let toml = toml::to_string(&Destination::new(GroupId(1), ChannelId(2))).unwrap();
        assert_eq!(toml, "group = 1\nchannel = 2\n");
    }

    #[test]
    fn debug_hides_payload_bytes() {
        let source = PlaybackSource::Encoded {
            data: Bytes::from_static(b"secret-audio"),
            format: AudioFormat::Opus,
        };
        let debug = format!("{source:?}");
        assert!(debug.contains("12"));
        assert!(!debug.contains("secret-audio"));
    }
}
