//! OpenAI Speech Provider
//!
//! Implements `SpeechBackend` using the OpenAI speech endpoint.
//!
//! The endpoint honours the requested container, so the reported format is
//! always the requested one. The persona hint is forwarded as `instructions`.
//!
//! # Supported Output Formats
//! - mp3, opus, wav

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::SynthesisError;
use crate::ports::{SpeechBackend, check_text};
use crate::types::{AudioData, AudioFormat, BackendKind, SynthesisRequest};

/// OpenAI rejects inputs above this many characters
const MAX_INPUT_LEN: usize = 4096;

/// OpenAI speech provider
#[derive(Clone)]
pub struct OpenAIBackend {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl std::fmt::Debug for OpenAIBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIBackend")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl OpenAIBackend {
    /// Create a new OpenAI backend sharing the given HTTP client
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

    /// Build the TTS endpoint URL
    fn tts_url(&self) -> String {
        format!("{}/audio/speech", self.base_url.trim_end_matches('/'))
    }

    /// Convert AudioFormat to OpenAI TTS response format string
    const fn response_format(format: AudioFormat) -> &'static str {
        match format {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Opus => "opus",
            AudioFormat::Wav => "wav",
        }
    }
}

/// OpenAI TTS request body
#[derive(Debug, Serialize)]
struct TtsRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    response_format: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    instructions: Option<&'a str>,
}

/// OpenAI API error response
#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
    code: Option<String>,
}

#[async_trait]
impl SpeechBackend for OpenAIBackend {
    #[instrument(skip(self, request), fields(text_len = request.text.len(), voice = %voice, format = %format))]
    async fn synthesize(
        &self,
        request: &SynthesisRequest,
        voice: &str,
        format: AudioFormat,
    ) -> Result<AudioData, SynthesisError> {
        check_text(&request.text, MAX_INPUT_LEN)?;

        let body = TtsRequest {
            model: &self.model,
            input: &request.text,
            voice,
            response_format: Self::response_format(format),
            instructions: request.persona.as_deref().filter(|p| !p.trim().is_empty()),
        };

        debug!("Synthesizing speech with OpenAI");

        let response = self
            .client
            .post(self.tts_url())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();

            if let Ok(api_error) = serde_json::from_str::<ApiError>(&error_body) {
                if api_error.error.code.as_deref() == Some("rate_limit_exceeded") {
                    return Err(SynthesisError::RateLimited);
                }
                return Err(SynthesisError::Backend {
                    status: status.as_u16(),
                    detail: api_error.error.message,
                });
            }

            if status.as_u16() == 429 {
                return Err(SynthesisError::RateLimited);
            }

            return Err(SynthesisError::Backend {
                status: status.as_u16(),
                detail: error_body,
            });
        }

        let audio_bytes: Bytes = response
            .bytes()
            .await
            .map_err(|e| SynthesisError::InvalidResponse(format!("Failed to read audio: {e}")))?;

        if audio_bytes.is_empty() {
            return Err(SynthesisError::InvalidResponse(
                "OpenAI returned an empty body".to_string(),
            ));
        }

        debug!(audio_size = audio_bytes.len(), "Speech synthesis complete");

        Ok(AudioData::new(audio_bytes.to_vec(), format))
    }

    fn kind(&self) -> BackendKind {
        BackendKind::OpenAI
    }

    fn builtin_voice(&self) -> &'static str {
        "nova"
    }
}
