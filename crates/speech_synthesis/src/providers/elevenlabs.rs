//! ElevenLabs Speech Provider
//!
//! The ElevenLabs endpoint produces MP3 regardless of what the caller asked
//! for, so results always report [`AudioFormat::Mp3`].

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::SynthesisError;
use crate::ports::{SpeechBackend, check_text};
use crate::types::{AudioData, AudioFormat, BackendKind, SynthesisRequest};

const MAX_INPUT_LEN: usize = 5000;

/// The only container this backend emits
const OUTPUT_FORMAT: AudioFormat = AudioFormat::Mp3;

/// ElevenLabs speech provider
#[derive(Clone)]
pub struct ElevenLabsBackend {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl std::fmt::Debug for ElevenLabsBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElevenLabsBackend")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl ElevenLabsBackend {
    #[must_use]
    pub fn new(
        client: Client,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into(),
            model: model.into(),
        }
    }

    fn tts_url(&self, voice: &str) -> String {
        format!(
            "{}/v1/text-to-speech/{voice}",
            self.base_url.trim_end_matches('/')
        )
    }
}

#[derive(Debug, Serialize)]
struct TtsRequest<'a> {
    text: &'a str,
    model_id: &'a str,
}

/// ElevenLabs wraps errors as `{"detail": {"status": "...", "message": "..."}}`
/// or, for validation failures, `{"detail": "..."}`
#[derive(Debug, Deserialize)]
struct ApiError {
    detail: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ApiErrorDetail {
    Structured { message: String },
    Plain(String),
}

impl ApiErrorDetail {
    fn into_message(self) -> String {
        match self {
            Self::Structured { message } | Self::Plain(message) => message,
        }
    }
}

#[async_trait]
impl SpeechBackend for ElevenLabsBackend {
    #[instrument(skip(self, request), fields(text_len = request.text.len(), voice = %voice, requested = %requested))]
    async fn synthesize(
        &self,
        request: &SynthesisRequest,
        voice: &str,
        requested: AudioFormat,
    ) -> Result<AudioData, SynthesisError> {
        check_text(&request.text, MAX_INPUT_LEN)?;

        if requested != OUTPUT_FORMAT {
            debug!("ElevenLabs ignores the requested format and returns mp3");
        }

        let response = self
            .client
            .post(self.tts_url(voice))
            .header("xi-api-key", &self.api_key)
            .header("accept", OUTPUT_FORMAT.mime_type())
            .json(&TtsRequest {
                text: &request.text,
                model_id: &self.model,
            })
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(SynthesisError::RateLimited);
        }
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ApiError>(&error_body)
                .map_or(error_body, |e| e.detail.into_message());
            return Err(SynthesisError::Backend {
                status: status.as_u16(),
                detail,
            });
        }

        let audio_bytes = response
            .bytes()
            .await
            .map_err(|e| SynthesisError::InvalidResponse(format!("Failed to read audio: {e}")))?;

        if audio_bytes.is_empty() {
            return Err(SynthesisError::InvalidResponse(
                "ElevenLabs returned an empty body".to_string(),
            ));
        }

        debug!(audio_size = audio_bytes.len(), "Speech synthesis complete");

        Ok(AudioData::new(audio_bytes.to_vec(), OUTPUT_FORMAT))
    }

    fn kind(&self) -> BackendKind {
        BackendKind::ElevenLabs
    }

    fn builtin_voice(&self) -> &'static str {
        // "Rachel"
        "21m00Tcm4TlvDq8ikWAM"
    }
}
