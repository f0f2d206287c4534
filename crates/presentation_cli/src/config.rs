//! Process configuration for the `voicecast` binary

use std::path::{Path, PathBuf};

use serde::Deserialize;
use speech_synthesis::SynthesisConfig;
use voice_delivery::DeliveryConfig;

/// Everything the binary reads at startup
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub speech: SynthesisConfig,

    #[serde(default)]
    pub delivery: DeliveryConfig,

    /// Where runtime backend/voice changes are persisted
    #[serde(default = "default_settings_path")]
    pub settings_path: PathBuf,

    /// Directory for debug dump artifacts
    #[serde(default = "default_debug_dir")]
    pub debug_dir: PathBuf,

    /// Explicit FFmpeg binary, otherwise looked up on `PATH`
    #[serde(default)]
    pub ffmpeg_path: Option<String>,
}

fn default_settings_path() -> PathBuf {
    PathBuf::from("data/voice_settings.json")
}

fn default_debug_dir() -> PathBuf {
    PathBuf::from("data/debug")
}

impl AppConfig {
    /// Load defaults, then `file` (or `voicecast.toml` if present), then
    /// `VOICECAST__*` environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be parsed.
    pub fn load(file: Option<&Path>) -> Result<Self, config::ConfigError> {
        let file_source = match file {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name("voicecast").required(false),
        };

        let builder = config::Config::builder()
            .add_source(file_source)
            // e.g. VOICECAST__SPEECH__OPENAI_API_KEY
            .add_source(
                config::Environment::with_prefix("VOICECAST")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Validate every section
    ///
    /// # Errors
    ///
    /// Returns the first problem found, prefixed with its section.
    pub fn validate(&self) -> Result<(), String> {
        self.speech.validate().map_err(|e| format!("speech: {e}"))?;
        self.delivery
            .validate()
            .map_err(|e| format!("delivery: {e}"))?;
        Ok(())
    }
}
