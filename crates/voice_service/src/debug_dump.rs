//! Debug artifacts: synthesized audio plus a JSON record of how it was made
//!
//! Each dump writes `<timestamp>_<requester>.<ext>` and a matching `.json`
//! next to it. Timestamps use `-` instead of `:` so the names are valid on
//! every filesystem.

use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use speech_synthesis::{AudioData, AudioFormat, BackendKind};
use tracing::debug;

use crate::error::ServiceError;

const FILE_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H-%M-%S%.3fZ";

/// What a caller wants rendered for inspection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DumpRequest {
    /// Who asked; part of the file name
    pub requester_id: String,
    /// Prompt the reply was generated from
    pub prompt: String,
    /// Persona hint forwarded to the backend
    pub persona: Option<String>,
    /// Text that is actually spoken
    pub reply_text: String,
    pub voice: Option<String>,
    pub format: Option<AudioFormat>,
}

/// Contents of the `.json` file written next to the audio
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DumpMetadata {
    /// RFC 3339, millisecond precision
    pub timestamp: String,
    pub requester_id: String,
    pub prompt: String,
    pub persona: Option<String>,
    pub reply_text: String,
    pub backend: BackendKind,
    pub voice: Option<String>,
    /// Format the backend actually produced
    pub format: AudioFormat,
}

/// Files written by a dump, plus the audio itself
#[derive(Debug, Clone)]
pub struct DebugArtifact {
    pub audio_path: PathBuf,
    pub metadata_path: PathBuf,
    pub metadata: DumpMetadata,
    pub audio: AudioData,
}

/// Base file name shared by the audio and metadata files
#[must_use]
pub fn file_stem(timestamp: DateTime<Utc>, requester_id: &str) -> String {
    let requester: String = requester_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let requester = if requester.is_empty() {
        "unknown".to_string()
    } else {
        requester
    };
    format!("{}_{requester}", timestamp.format(FILE_TIMESTAMP_FORMAT))
}

/// Metadata timestamp in RFC 3339 form
#[must_use]
pub fn iso_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Write the audio and metadata files into `dir`, creating it if needed
pub(crate) async fn write_artifact(
    dir: &Path,
    stem: &str,
    audio: AudioData,
    metadata: DumpMetadata,
) -> Result<DebugArtifact, ServiceError> {
    tokio::fs::create_dir_all(dir).await?;

    let audio_path = dir.join(audio.filename(stem));
    let metadata_path = dir.join(format!("{stem}.json"));

    tokio::fs::write(&audio_path, audio.data()).await?;
    tokio::fs::write(&metadata_path, serde_json::to_vec_pretty(&metadata)?).await?;

    debug!(
        audio_path = %audio_path.display(),
        metadata_path = %metadata_path.display(),
        "Wrote debug artifact"
    );

    Ok(DebugArtifact {
        audio_path,
        metadata_path,
        metadata,
        audio,
    })
}
