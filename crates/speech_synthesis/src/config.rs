//! Configuration for speech synthesis

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{AudioFormat, BackendKind};

/// Sample rate used for raw PCM output when none is configured
pub const DEFAULT_SAMPLE_RATE: u32 = 24_000;

/// Locale used for raw-sample voices that carry no locale prefix
pub const DEFAULT_LOCALE: &str = "en-US";

/// Configuration for the synthesis gateway and its backends
#[derive(Clone, Serialize, Deserialize)]
pub struct SynthesisConfig {
    /// Master switch for voice output
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Backend selected at startup
    #[serde(default)]
    pub backend: BackendKind,

    /// Voice used when a request names none; backend default when unset
    #[serde(default)]
    pub default_voice: Option<String>,

    /// Output format used when a request names none
    #[serde(default = "default_output_format")]
    pub default_format: AudioFormat,

    /// Request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// OpenAI API key
    #[serde(default, skip_serializing)]
    pub openai_api_key: Option<String>,

    /// OpenAI API base URL (for custom endpoints)
    #[serde(default = "default_openai_base_url")]
    pub openai_base_url: String,

    /// OpenAI speech model
    #[serde(default = "default_openai_model")]
    pub openai_model: String,

    /// ElevenLabs API key
    #[serde(default, skip_serializing)]
    pub elevenlabs_api_key: Option<String>,

    /// ElevenLabs API base URL
    #[serde(default = "default_elevenlabs_base_url")]
    pub elevenlabs_base_url: String,

    /// ElevenLabs model id
    #[serde(default = "default_elevenlabs_model")]
    pub elevenlabs_model: String,

    /// Google Cloud API key
    #[serde(default, skip_serializing)]
    pub google_api_key: Option<String>,

    /// Google Cloud Text-to-Speech base URL
    #[serde(default = "default_google_base_url")]
    pub google_base_url: String,

    /// Sample rate for raw PCM output; ignored unless positive and finite
    #[serde(default)]
    pub google_sample_rate: Option<f64>,

    /// Locale for voices without a `xx-YY` prefix
    #[serde(default)]
    pub google_default_locale: Option<String>,
}

const fn default_enabled() -> bool {
    true
}

const fn default_output_format() -> AudioFormat {
    AudioFormat::Mp3
}

const fn default_timeout_ms() -> u64 {
    30000 // 30 seconds
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o-mini-tts".to_string()
}

fn default_elevenlabs_base_url() -> String {
    "https://api.elevenlabs.io".to_string()
}

fn default_elevenlabs_model() -> String {
    "eleven_multilingual_v2".to_string()
}

fn default_google_base_url() -> String {
    "https://texttospeech.googleapis.com".to_string()
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            backend: BackendKind::default(),
            default_voice: None,
            default_format: default_output_format(),
            timeout_ms: default_timeout_ms(),
            openai_api_key: None,
            openai_base_url: default_openai_base_url(),
            openai_model: default_openai_model(),
            elevenlabs_api_key: None,
            elevenlabs_base_url: default_elevenlabs_base_url(),
            elevenlabs_model: default_elevenlabs_model(),
            google_api_key: None,
            google_base_url: default_google_base_url(),
            google_sample_rate: None,
            google_default_locale: None,
        }
    }
}

impl fmt::Debug for SynthesisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |key: &Option<String>| key.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("SynthesisConfig")
            .field("enabled", &self.enabled)
            .field("backend", &self.backend)
            .field("default_voice", &self.default_voice)
            .field("default_format", &self.default_format)
            .field("timeout_ms", &self.timeout_ms)
            .field("openai_api_key", &redact(&self.openai_api_key))
            .field("openai_base_url", &self.openai_base_url)
            .field("openai_model", &self.openai_model)
            .field("elevenlabs_api_key", &redact(&self.elevenlabs_api_key))
            .field("elevenlabs_base_url", &self.elevenlabs_base_url)
            .field("elevenlabs_model", &self.elevenlabs_model)
            .field("google_api_key", &redact(&self.google_api_key))
            .field("google_base_url", &self.google_base_url)
            .field("google_sample_rate", &self.google_sample_rate)
            .field("google_default_locale", &self.google_default_locale)
            .finish()
    }
}

impl SynthesisConfig {
    /// Create a minimal config for testing
    #[cfg(test)]
    pub fn test() -> Self {
        Self {
            openai_api_key: Some("test-key".to_string()),
            ..Default::default()
        }
    }

    /// Credential for a backend; blank values count as absent
    #[must_use]
    pub fn credential(&self, kind: BackendKind) -> Option<&str> {
        let key = match kind {
            BackendKind::OpenAI => &self.openai_api_key,
            BackendKind::ElevenLabs => &self.elevenlabs_api_key,
            BackendKind::Google => &self.google_api_key,
        };
        key.as_deref().map(str::trim).filter(|k| !k.is_empty())
    }

    /// Sample rate for raw PCM output
    ///
    /// The configured value wins only when it is a positive, finite number
    /// that fits a WAV header.
    #[must_use]
    pub fn effective_sample_rate(&self) -> u32 {
        match self.google_sample_rate {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            Some(rate) if rate.is_finite() && rate >= 1.0 && rate <= f64::from(u32::MAX) => {
                rate.round() as u32
            },
            _ => DEFAULT_SAMPLE_RATE,
        }
    }

    /// Locale used when a voice name does not carry one
    #[must_use]
    pub fn fallback_locale(&self) -> &str {
        self.google_default_locale
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .unwrap_or(DEFAULT_LOCALE)
    }

    /// Validate the configuration
    ///
    /// A missing credential for a non-selected backend is fine; the selected
    /// one must have a credential while voice output is enabled.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.timeout_ms == 0 {
            return Err("Timeout must be greater than 0".to_string());
        }

        if self.enabled && self.credential(self.backend).is_none() {
            return Err(format!(
                "API key for the selected backend '{}' is required while voice is enabled",
                self.backend
            ));
        }

        Ok(())
    }
}
