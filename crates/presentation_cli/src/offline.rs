//! Voice transport stand-in for the command-line tool
//!
//! The binary never holds a voice session; any attempt to join is refused.

use std::sync::Arc;

use async_trait::async_trait;
use voice_delivery::{
    AudioPlayer, Destination, PlaybackSource, TransportError, VoiceConnection, VoiceTransport,
};

const REASON: &str = "voicecast has no live voice transport";

#[derive(Debug, Default)]
pub struct OfflineTransport;

#[async_trait]
impl VoiceTransport for OfflineTransport {
    async fn join(
        &self,
        _destination: &Destination,
    ) -> Result<Arc<dyn VoiceConnection>, TransportError> {
        Err(TransportError::Rejected(REASON.to_string()))
    }

    fn create_player(&self) -> Arc<dyn AudioPlayer> {
        Arc::new(OfflinePlayer)
    }
}

#[derive(Debug)]
struct OfflinePlayer;

#[async_trait]
impl AudioPlayer for OfflinePlayer {
    fn play(&self, _source: PlaybackSource) -> Result<(), TransportError> {
        Err(TransportError::Rejected(REASON.to_string()))
    }

    async fn wait_started(&self) -> Result<(), TransportError> {
        Err(TransportError::Disconnected)
    }

    async fn wait_finished(&self) -> Result<(), TransportError> {
        Err(TransportError::Disconnected)
    }

    fn stop(&self) {}
}
