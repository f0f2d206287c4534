//! Google Cloud Text-to-Speech Provider
//!
//! Audio comes back base64-encoded inside a JSON document. WAV output is
//! requested as raw `LINEAR16` samples and wrapped locally in a RIFF/WAVE
//! header at the configured sample rate.
//!
//! The request locale is derived from the voice name (`en-US-Neural2-F` is
//! spoken as `en-US`), falling back to the configured default.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::SynthesisError;
use crate::ports::{SpeechBackend, check_text};
use crate::types::{AudioData, AudioFormat, BackendKind, SynthesisRequest};
use crate::wav::{resolve_locale, wrap_pcm16_mono};

/// Google limits the input field to 5000 bytes
const MAX_INPUT_LEN: usize = 5000;

/// Google Cloud TTS provider
#[derive(Clone)]
pub struct GoogleBackend {
    client: Client,
    api_key: String,
    base_url: String,
    sample_rate: u32,
    fallback_locale: String,
}

impl std::fmt::Debug for GoogleBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleBackend")
            .field("base_url", &self.base_url)
            .field("sample_rate", &self.sample_rate)
            .field("fallback_locale", &self.fallback_locale)
            .finish_non_exhaustive()
    }
}

impl GoogleBackend {
    /// Create a new Google backend
    ///
    /// `sample_rate` is used for raw PCM output and `fallback_locale` for
    /// voices whose name carries no `xx-YY` prefix.
    #[must_use]
    pub fn new(
        client: Client,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        sample_rate: u32,
        fallback_locale: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into(),
            sample_rate,
            fallback_locale: fallback_locale.into(),
        }
    }

    fn synthesize_url(&self) -> String {
        format!("{}/v1/text:synthesize", self.base_url.trim_end_matches('/'))
    }

    const fn audio_encoding(format: AudioFormat) -> &'static str {
        match format {
            AudioFormat::Wav => "LINEAR16",
            AudioFormat::Mp3 => "MP3",
            AudioFormat::Opus => "OGG_OPUS",
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeRequest<'a> {
    input: TextInput<'a>,
    voice: VoiceSelection<'a>,
    audio_config: AudioConfig,
}

#[derive(Debug, Serialize)]
struct TextInput<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceSelection<'a> {
    language_code: String,
    name: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AudioConfig {
    audio_encoding: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sample_rate_hertz: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    audio_content: String,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

#[async_trait]
impl SpeechBackend for GoogleBackend {
    #[instrument(skip(self, request), fields(text_len = request.text.len(), voice = %voice, format = %format))]
    async fn synthesize(
        &self,
        request: &SynthesisRequest,
        voice: &str,
        format: AudioFormat,
    ) -> Result<AudioData, SynthesisError> {
        check_text(&request.text, MAX_INPUT_LEN)?;

        let raw_pcm = format == AudioFormat::Wav;
        let language_code = resolve_locale(voice, &self.fallback_locale);

        let body = SynthesizeRequest {
            input: TextInput {
                text: &request.text,
            },
            voice: VoiceSelection {
                language_code,
                name: voice,
            },
            audio_config: AudioConfig {
                audio_encoding: Self::audio_encoding(format),
                sample_rate_hertz: raw_pcm.then_some(self.sample_rate),
            },
        };

        debug!(language_code = %body.voice.language_code, "Synthesizing speech with Google");

        let response = self
            .client
            .post(self.synthesize_url())
            .header("X-Goog-Api-Key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(SynthesisError::RateLimited);
        }
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ApiError>(&error_body)
                .map_or(error_body, |e| e.error.message);
            return Err(SynthesisError::Backend {
                status: status.as_u16(),
                detail,
            });
        }

        let payload: SynthesizeResponse = response.json().await.map_err(|e| {
            SynthesisError::InvalidResponse(format!("Failed to parse synthesis response: {e}"))
        })?;

        let decoded = BASE64.decode(payload.audio_content.as_bytes()).map_err(|e| {
            SynthesisError::InvalidResponse(format!("audioContent is not valid base64: {e}"))
        })?;

        if decoded.is_empty() {
            return Err(SynthesisError::InvalidResponse(
                "Google returned empty audio".to_string(),
            ));
        }

        debug!(audio_size = decoded.len(), raw_pcm, "Speech synthesis complete");

        if raw_pcm {
            let wav = wrap_pcm16_mono(&decoded, self.sample_rate);
            return Ok(AudioData::new(wav, AudioFormat::Wav).with_sample_rate(self.sample_rate));
        }

        Ok(AudioData::new(decoded, format))
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Google
    }

    fn builtin_voice(&self) -> &'static str {
        "en-US-Neural2-F"
    }
}
