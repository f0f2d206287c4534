//! Voice service - the operations collaborators call
//!
//! Every operation answers with a short human-readable string; technical
//! detail only goes to the logs. The one exception is [`VoiceService::debug_dump`],
//! which hands back the artifact itself.

use std::fmt::{self, Write as _};
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use speech_synthesis::{AudioFormat, BackendKind, SynthesisGateway, SynthesisRequest};
use tracing::{error, info, instrument, warn};
use voice_delivery::{
    DeliveryError, Destination, GroupId, LeaveOutcome, PlaybackHandle, VoiceDeliveryPipeline,
};

use crate::debug_dump::{
    DebugArtifact, DumpMetadata, DumpRequest, file_stem, iso_timestamp, write_artifact,
};
use crate::error::ServiceError;
use crate::settings::{RuntimeSettings, SettingsStore};

const NOT_CONFIGURED: &str = "Voice playback is not configured right now.";
const NOTHING_TO_SAY: &str = "There is nothing to say.";
const QUEUED: &str = "Queued your message for playback.";
const PLAYED: &str = "Played your message.";
const NOT_SAVED: &str = " The change could not be saved and will be lost on restart.";

/// Text to speak into a destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayRequest {
    pub destination: Destination,
    pub text: String,
    pub persona: Option<String>,
    pub voice: Option<String>,
    pub format: Option<AudioFormat>,
}

impl PlayRequest {
    #[must_use]
    pub fn new(destination: Destination, text: impl Into<String>) -> Self {
        Self {
            destination,
            text: text.into(),
            persona: None,
            voice: None,
            format: None,
        }
    }

    #[must_use]
    pub fn with_persona(mut self, persona: impl Into<String>) -> Self {
        self.persona = Some(persona.into());
        self
    }

    #[must_use]
    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = Some(voice.into());
        self
    }

    #[must_use]
    pub const fn with_format(mut self, format: AudioFormat) -> Self {
        self.format = Some(format);
        self
    }

    fn synthesis_request(&self) -> SynthesisRequest {
        SynthesisRequest {
            text: self.text.clone(),
            voice: self.voice.clone(),
            format: self.format,
            persona: self.persona.clone(),
        }
    }
}

/// Facade over synthesis, delivery and runtime settings
pub struct VoiceService {
    gateway: Arc<SynthesisGateway>,
    pipeline: Arc<VoiceDeliveryPipeline>,
    settings: SettingsStore,
    debug_dir: PathBuf,
}

impl fmt::Debug for VoiceService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VoiceService")
            .field("settings", &self.settings)
            .field("debug_dir", &self.debug_dir)
            .finish_non_exhaustive()
    }
}

impl VoiceService {
    /// Create the service and apply any persisted backend/voice selection
    pub fn new(
        gateway: Arc<SynthesisGateway>,
        pipeline: Arc<VoiceDeliveryPipeline>,
        settings: SettingsStore,
        debug_dir: impl Into<PathBuf>,
    ) -> Self {
        let selection = gateway.selection();
        let configured = RuntimeSettings {
            backend: selection.backend,
            voice: selection.voice,
            updated_at: None,
        };
        let persisted = settings.load_or(configured);
        gateway.restore(persisted.selection());

        Self {
            gateway,
            pipeline,
            settings,
            debug_dir: debug_dir.into(),
        }
    }

    /// Queue text for playback and return at once
    ///
    /// The outcome is logged when the delivery finishes.
    #[instrument(skip(self, request), fields(destination = %request.destination, text_len = request.text.len()))]
    pub fn play(&self, request: PlayRequest) -> String {
        if let Some(rejection) = self.precheck(&request) {
            return rejection.to_string();
        }

        let destination = request.destination;
        let handle = self.schedule(&request);
        tokio::spawn(async move {
            match Self::settle(handle.await) {
                Ok(()) => info!(%destination, "Voice playback finished"),
                Err(err) => {
                    warn!(%destination, error = %err, user_message = err.user_message(), "Voice playback failed");
                },
            }
        });

        QUEUED.to_string()
    }

    /// Queue text for playback and wait for the outcome
    #[instrument(skip(self, request), fields(destination = %request.destination, text_len = request.text.len()))]
    pub async fn play_and_wait(&self, request: PlayRequest) -> String {
        if let Some(rejection) = self.precheck(&request) {
            return rejection.to_string();
        }

        match Self::settle(self.schedule(&request).await) {
            Ok(()) => PLAYED.to_string(),
            Err(err) => {
                error!(error = %err, "Voice playback failed");
                err.user_message().to_string()
            },
        }
    }

    /// Leave the group's voice channel
    pub fn leave(&self, group: GroupId) -> String {
        match self.pipeline.leave(group) {
            LeaveOutcome::Left => "Left the voice channel.".to_string(),
            LeaveOutcome::NotConnected => "Not connected to a voice channel.".to_string(),
        }
    }

    /// Synthesize `reply_text` and keep the audio and its provenance on disk
    #[instrument(skip(self, request), fields(requester = %request.requester_id))]
    pub async fn debug_dump(&self, request: DumpRequest) -> Result<DebugArtifact, ServiceError> {
        let selection = self.gateway.selection();
        let synthesis = SynthesisRequest {
            text: request.reply_text.clone(),
            voice: request.voice.clone(),
            format: request.format,
            persona: request.persona.clone(),
        };

        let audio = self.gateway.synthesize(&synthesis).await?;

        let now = Utc::now();
        let metadata = DumpMetadata {
            timestamp: iso_timestamp(now),
            requester_id: request.requester_id.clone(),
            prompt: request.prompt,
            persona: request.persona,
            reply_text: request.reply_text,
            backend: selection.backend,
            voice: request
                .voice
                .filter(|v| !v.trim().is_empty())
                .or_else(|| self.gateway.effective_voice()),
            format: audio.format(),
        };

        let stem = file_stem(now, &request.requester_id);
        let artifact = write_artifact(&self.debug_dir, &stem, audio, metadata).await?;

        info!(path = %artifact.audio_path.display(), "Debug dump written");
        Ok(artifact)
    }

    /// Switch the synthesis backend and persist the choice
    pub fn set_backend(&self, backend: BackendKind) -> String {
        if !self.gateway.has_credential(backend) {
            return format!("The {backend} backend has no credential configured.");
        }
        self.gateway.select_backend(backend);
        format!("Speech backend set to {backend}.{}", self.persist())
    }

    /// Set or clear the voice override and persist the choice
    pub fn set_voice(&self, voice: Option<String>) -> String {
        self.gateway.set_default_voice(voice);
        let message = match self.gateway.selection().voice {
            Some(voice) => format!("Voice set to {voice}."),
            None => "Voice reset to the backend default.".to_string(),
        };
        format!("{message}{}", self.persist())
    }

    /// Multi-line summary of the current configuration
    pub fn status(&self) -> String {
        let selection = self.gateway.selection();
        let credentials: Vec<String> = BackendKind::ALL
            .iter()
            .map(|kind| {
                let state = if self.gateway.has_credential(*kind) {
                    "configured"
                } else {
                    "missing"
                };
                format!("{kind} ({state})")
            })
            .collect();

        let voice = self
            .gateway
            .effective_voice()
            .unwrap_or_else(|| "backend default".to_string());

        let mut status = String::new();
        let _ = writeln!(
            status,
            "Voice output: {}",
            if self.gateway.is_enabled() { "enabled" } else { "disabled" }
        );
        let _ = writeln!(status, "Backend: {}", selection.backend);
        let _ = writeln!(status, "Voice: {voice}");
        let _ = writeln!(status, "Format: {}", self.gateway.default_format());
        let _ = writeln!(status, "Credentials: {}", credentials.join(", "));
        let _ = write!(status, "Active voice sessions: {}", self.pipeline.active_sessions());
        status
    }

    fn precheck(&self, request: &PlayRequest) -> Option<&'static str> {
        if request.text.trim().is_empty() {
            return Some(NOTHING_TO_SAY);
        }
        let backend = self.gateway.selection().backend;
        if !self.gateway.is_enabled() || !self.gateway.has_credential(backend) {
            return Some(NOT_CONFIGURED);
        }
        None
    }

    fn schedule(&self, request: &PlayRequest) -> PlaybackHandle<Result<(), DeliveryError>> {
        let gateway = Arc::clone(&self.gateway);
        let synthesis = request.synthesis_request();
        self.pipeline
            .deliver(request.destination, async move { gateway.synthesize(&synthesis).await })
    }

    fn settle(
        outcome: Result<Result<(), DeliveryError>, voice_delivery::SchedulerError>,
    ) -> Result<(), DeliveryError> {
        outcome.unwrap_or_else(|err| Err(DeliveryError::from(err)))
    }

    /// Save the gateway's selection; returns a note for the user on failure
    fn persist(&self) -> &'static str {
        let settings = RuntimeSettings::from_selection(self.gateway.selection());
        match self.settings.save(&settings) {
            Ok(()) => "",
            Err(err) => {
                error!(error = %err, path = %self.settings.path().display(), "Failed to persist runtime settings");
                NOT_SAVED
            },
        }
    }
}
