//! Synthesis gateway
//!
//! Single entry point that resolves voice and format defaults, picks the
//! selected backend and delegates. The backend and voice selection can be
//! switched at runtime without locking.

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::config::SynthesisConfig;
use crate::error::SynthesisError;
use crate::ports::SpeechBackend;
use crate::providers::{ElevenLabsBackend, GoogleBackend, OpenAIBackend};
use crate::types::{AudioData, AudioFormat, BackendKind, SynthesisRequest};

/// Runtime-switchable part of the gateway state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    /// Backend handling requests
    pub backend: BackendKind,
    /// Voice override; the backend's own default when `None`
    pub voice: Option<String>,
}

/// Normalizes several speech backends behind one `synthesize` call
pub struct SynthesisGateway {
    enabled: bool,
    default_format: AudioFormat,
    backends: Vec<Arc<dyn SpeechBackend>>,
    selection: ArcSwap<Selection>,
}

impl std::fmt::Debug for SynthesisGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kinds: Vec<BackendKind> = self.backends.iter().map(|b| b.kind()).collect();
        f.debug_struct("SynthesisGateway")
            .field("enabled", &self.enabled)
            .field("default_format", &self.default_format)
            .field("backends", &kinds)
            .field("selection", &**self.selection.load())
            .finish()
    }
}

impl SynthesisGateway {
    /// Build the gateway and an adapter for every backend with a credential
    ///
    /// # Errors
    ///
    /// Returns `SynthesisError::Configuration` if the HTTP client cannot be built.
    pub fn from_config(config: &SynthesisConfig) -> Result<Self, SynthesisError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| SynthesisError::Configuration(format!("Failed to build HTTP client: {e}")))?;

        let mut backends: Vec<Arc<dyn SpeechBackend>> = Vec::new();

        if let Some(key) = config.credential(BackendKind::OpenAI) {
            backends.push(Arc::new(OpenAIBackend::new(
                client.clone(),
                key,
                &config.openai_base_url,
                &config.openai_model,
            )));
        }
        if let Some(key) = config.credential(BackendKind::ElevenLabs) {
            backends.push(Arc::new(ElevenLabsBackend::new(
                client.clone(),
                key,
                &config.elevenlabs_base_url,
                &config.elevenlabs_model,
            )));
        }
        if let Some(key) = config.credential(BackendKind::Google) {
            backends.push(Arc::new(GoogleBackend::new(
                client,
                key,
                &config.google_base_url,
                config.effective_sample_rate(),
                config.fallback_locale(),
            )));
        }

        if config.enabled && config.credential(config.backend).is_none() {
            warn!(backend = %config.backend, "Selected speech backend has no credential");
        }

        Ok(Self::with_backends(config, backends))
    }

    /// Build a gateway over pre-constructed backends
    #[must_use]
    pub fn with_backends(config: &SynthesisConfig, backends: Vec<Arc<dyn SpeechBackend>>) -> Self {
        let selection = Selection {
            backend: config.backend,
            voice: config
                .default_voice
                .clone()
                .filter(|v| !v.trim().is_empty()),
        };
        Self {
            enabled: config.enabled,
            default_format: config.default_format,
            backends,
            selection: ArcSwap::from_pointee(selection),
        }
    }

    /// Synthesize speech with the currently selected backend
    ///
    /// The returned format is the one the backend produced.
    ///
    /// # Errors
    ///
    /// Returns `SynthesisError::Configuration` when voice output is disabled
    /// or the selected backend has no credential, otherwise whatever the
    /// backend reports.
    #[instrument(skip(self, request), fields(text_len = request.text.len()))]
    pub async fn synthesize(&self, request: &SynthesisRequest) -> Result<AudioData, SynthesisError> {
        if !self.enabled {
            return Err(SynthesisError::Configuration(
                "voice output is disabled".to_string(),
            ));
        }

        let selection = self.selection.load();
        let backend = self.backend(selection.backend).ok_or_else(|| {
            SynthesisError::Configuration(format!(
                "no credential configured for backend '{}'",
                selection.backend
            ))
        })?;

        let voice = request
            .voice
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .or(selection.voice.as_deref())
            .unwrap_or_else(|| backend.builtin_voice());
        let format = request.format.unwrap_or(self.default_format);

        debug!(backend = %selection.backend, voice, requested = %format, "Dispatching synthesis");

        let audio = backend.synthesize(request, voice, format).await?;

        if audio.format() != format {
            debug!(requested = %format, produced = %audio.format(), "Backend produced a different format");
        }

        Ok(audio)
    }

    /// Switch the backend handling subsequent requests
    ///
    /// Voice identifiers are backend-specific, so switching to a different
    /// backend clears the voice override.
    pub fn select_backend(&self, backend: BackendKind) {
        self.selection.rcu(|current| {
            let voice = if current.backend == backend {
                current.voice.clone()
            } else {
                None
            };
            Selection { backend, voice }
        });
        info!(%backend, "Speech backend selected");
    }

    /// Set or clear the voice override
    pub fn set_default_voice(&self, voice: Option<String>) {
        let voice = voice.filter(|v| !v.trim().is_empty());
        self.selection.rcu(|current| Selection {
            backend: current.backend,
            voice: voice.clone(),
        });
        info!(voice = ?voice, "Default voice updated");
    }

    /// Restore a persisted selection verbatim
    pub fn restore(&self, selection: Selection) {
        debug!(?selection, "Restoring speech selection");
        self.selection.store(Arc::new(selection));
    }

    /// Snapshot of the current backend and voice
    #[must_use]
    pub fn selection(&self) -> Selection {
        (**self.selection.load()).clone()
    }

    /// Voice requests use when they name none
    #[must_use]
    pub fn effective_voice(&self) -> Option<String> {
        let selection = self.selection.load();
        selection.voice.clone().or_else(|| {
            self.backend(selection.backend)
                .map(|b| b.builtin_voice().to_string())
        })
    }

    /// Whether an adapter exists for `kind`
    #[must_use]
    pub fn has_credential(&self, kind: BackendKind) -> bool {
        self.backend(kind).is_some()
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[must_use]
    pub const fn default_format(&self) -> AudioFormat {
        self.default_format
    }

    fn backend(&self, kind: BackendKind) -> Option<&Arc<dyn SpeechBackend>> {
        self.backends.iter().find(|b| b.kind() == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    /// Records what it was asked for and answers with a fixed format
    struct RecordingBackend {
        kind: BackendKind,
        produces: Option<AudioFormat>,
        calls: Mutex<Vec<(String, AudioFormat)>>,
    }

    impl RecordingBackend {
        fn new(kind: BackendKind) -> Arc<Self> {
            Arc::new(Self {
                kind,
                produces: None,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn fixed(kind: BackendKind, format: AudioFormat) -> Arc<Self> {
            Arc::new(Self {
                kind,
                produces: Some(format),
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl SpeechBackend for RecordingBackend {
        async fn synthesize(
            &self,
            _request: &SynthesisRequest,
            voice: &str,
            format: AudioFormat,
        ) -> Result<AudioData, SynthesisError> {
            self.calls.lock().push((voice.to_string(), format));
            Ok(AudioData::new(vec![1, 2, 3], self.produces.unwrap_or(format)))
        }

        fn kind(&self) -> BackendKind {
            self.kind
        }

        fn builtin_voice(&self) -> &'static str {
            "builtin"
        }
    }

    fn gateway_with(
        config: &SynthesisConfig,
        backends: &[Arc<RecordingBackend>],
    ) -> SynthesisGateway {
        let backends = backends
            .iter()
            .map(|b| Arc::clone(b) as Arc<dyn SpeechBackend>)
            .collect();
        SynthesisGateway::with_backends(config, backends)
    }

    #[tokio::test]
    async fn disabled_gateway_is_configuration_error() {
        let config = SynthesisConfig {
            enabled: false,
            ..SynthesisConfig::test()
        };
        let openai = RecordingBackend::new(BackendKind::OpenAI);
        let gateway = gateway_with(&config, &[Arc::clone(&openai)]);

        let result = gateway.synthesize(&SynthesisRequest::new("hi")).await;

        assert!(matches!(result, Err(SynthesisError::Configuration(_))));
        assert!(openai.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn missing_credential_is_configuration_error() {
        let config = SynthesisConfig {
            backend: BackendKind::Google,
            ..SynthesisConfig::test()
        };
        let gateway = gateway_with(&config, &[RecordingBackend::new(BackendKind::OpenAI)]);

        let err = gateway
            .synthesize(&SynthesisRequest::new("hi"))
            .await
            .unwrap_err();

        assert!(matches!(err, SynthesisError::Configuration(_)));
        assert!(err.to_string().contains("google"));
    }

    #[test]
    fn from_config_only_builds_backends_with_credentials() {
        let config = SynthesisConfig {
            elevenlabs_api_key: Some("xi".to_string()),
            google_api_key: Some("  ".to_string()),
            ..SynthesisConfig::test()
        };

        let gateway = SynthesisGateway::from_config(&config).unwrap();

        assert!(gateway.has_credential(BackendKind::OpenAI));
        assert!(gateway.has_credential(BackendKind::ElevenLabs));
        assert!(!gateway.has_credential(BackendKind::Google));
    }

    #[tokio::test]
    async fn defaults_fill_missing_voice_and_format() {
        let config = SynthesisConfig {
            default_format: AudioFormat::Opus,
            ..SynthesisConfig::test()
        };
        let openai = RecordingBackend::new(BackendKind::OpenAI);
        let gateway = gateway_with(&config, &[Arc::clone(&openai)]);

        gateway.synthesize(&SynthesisRequest::new("hi")).await.unwrap();
        gateway.set_default_voice(Some("shimmer".to_string()));
        gateway.synthesize(&SynthesisRequest::new("hi")).await.unwrap();
        gateway
            .synthesize(
                &SynthesisRequest::new("hi")
                    .with_voice("echo")
                    .with_format(AudioFormat::Wav),
            )
            .await
            .unwrap();

        let calls = openai.calls.lock().clone();
        assert_eq!(
            calls,
            vec![
                ("builtin".to_string(), AudioFormat::Opus),
                ("shimmer".to_string(), AudioFormat::Opus),
                ("echo".to_string(), AudioFormat::Wav),
            ]
        );
    }

    #[tokio::test]
    async fn backend_format_wins_over_requested() {
        let config = SynthesisConfig {
            backend: BackendKind::ElevenLabs,
            ..SynthesisConfig::test()
        };
        let gateway = gateway_with(
            &config,
            &[RecordingBackend::fixed(BackendKind::ElevenLabs, AudioFormat::Mp3)],
        );

        let audio = gateway
            .synthesize(&SynthesisRequest::new("hi").with_format(AudioFormat::Wav))
            .await
            .unwrap();

        assert_eq!(audio.format(), AudioFormat::Mp3);
    }

    #[tokio::test]
    async fn select_backend_routes_subsequent_requests() {
        let config = SynthesisConfig::test();
        let openai = RecordingBackend::new(BackendKind::OpenAI);
        let google = RecordingBackend::new(BackendKind::Google);
        let gateway = gateway_with(&config, &[Arc::clone(&openai), Arc::clone(&google)]);

        gateway.set_default_voice(Some("nova".to_string()));
        gateway.select_backend(BackendKind::Google);
        gateway.synthesize(&SynthesisRequest::new("hi")).await.unwrap();

        assert!(openai.calls.lock().is_empty());
        assert_eq!(google.calls.lock()[0].0, "builtin");
        assert_eq!(
            gateway.selection(),
            Selection {
                backend: BackendKind::Google,
                voice: None
            }
        );
    }

    #[test]
    fn reselecting_same_backend_keeps_voice() {
        let gateway = gateway_with(&SynthesisConfig::test(), &[]);
        gateway.set_default_voice(Some("nova".to_string()));
        gateway.select_backend(BackendKind::OpenAI);
        assert_eq!(gateway.selection().voice.as_deref(), Some("nova"));
    }

    #[test]
    fn blank_voice_clears_override() {
        let gateway = gateway_with(&SynthesisConfig::test(), &[]);
        gateway.set_default_voice(Some("nova".to_string()));
        gateway.set_default_voice(Some("  ".to_string()));
        assert_eq!(gateway.selection().voice, None);
    }

    #[test]
    fn restore_replaces_selection() {
        let gateway = gateway_with(&SynthesisConfig::test(), &[]);
        let persisted = Selection {
            backend: BackendKind::ElevenLabs,
            voice: Some("rachel".to_string()),
        };
        gateway.restore(persisted.clone());
        assert_eq!(gateway.selection(), persisted);
    }

    #[test]
    fn effective_voice_prefers_override() {
        let gateway = gateway_with(
            &SynthesisConfig::test(),
            &[RecordingBackend::new(BackendKind::OpenAI)],
        );
        assert_eq!(gateway.effective_voice().as_deref(), Some("builtin"));
        gateway.set_default_voice(Some("alloy".to_string()));
        assert_eq!(gateway.effective_voice().as_deref(), Some("alloy"));
    }

    #[test]
    fn debug_output_lists_backends() {
        let gateway = gateway_with(
            &SynthesisConfig::test(),
            &[RecordingBackend::new(BackendKind::OpenAI)],
        );
        let debug = format!("{gateway:?}");
        assert!(debug.contains("OpenAI"));
        assert!(!debug.contains("test-key"));
    }
}
