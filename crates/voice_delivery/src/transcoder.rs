//! Conversion of synthesized audio into the transport's streaming codec
//!
//! The voice transport only accepts Opus at 48 kHz stereo in 20 ms frames.
//! Backends produce WAV, MP3 or Ogg/Opus at arbitrary rates, so every clip
//! is re-encoded before playback.

use std::process::Stdio;

use async_trait::async_trait;
use bytes::Bytes;
#[cfg(test)]
use mockall::automock;
use speech_synthesis::{AudioData, AudioFormat};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, instrument};

use crate::error::DeliveryError;
use crate::transport::PlaybackSource;

/// Sample rate required by the voice transport
pub const STREAM_SAMPLE_RATE: u32 = 48_000;

/// Channel count required by the voice transport
pub const STREAM_CHANNELS: u8 = 2;

/// Opus frame duration required by the voice transport
pub const STREAM_FRAME_MS: u8 = 20;

/// Port for decoding a synthesized container into the streaming codec
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Convert `audio` into something the player can stream directly
    async fn to_stream_codec(&self, audio: &AudioData) -> Result<PlaybackSource, DeliveryError>;
}

/// Transcoder backed by the FFmpeg command-line tool
///
/// FFmpeg must be installed on the system.
#[derive(Debug, Clone, Default)]
pub struct FfmpegTranscoder {
    /// FFmpeg binary path (defaults to "ffmpeg" in PATH)
    ffmpeg_path: Option<String>,
}

impl FfmpegTranscoder {
    #[must_use]
    pub const fn new() -> Self {
        Self { ffmpeg_path: None }
    }

    /// Use a specific FFmpeg binary
    #[must_use]
    pub fn with_ffmpeg_path(path: impl Into<String>) -> Self {
        Self {
            ffmpeg_path: Some(path.into()),
        }
    }

    fn ffmpeg_path(&self) -> &str {
        self.ffmpeg_path.as_deref().unwrap_or("ffmpeg")
    }

    /// Check if FFmpeg is available on the system
    #[instrument(skip(self))]
    pub async fn is_available(&self) -> bool {
        Command::new(self.ffmpeg_path())
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .is_ok_and(|status| status.success())
    }

    /// Demuxer hint for the input container
    const fn input_format(format: AudioFormat) -> &'static str {
        match format {
            AudioFormat::Wav => "wav",
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Opus => "ogg",
        }
    }

    /// Full argument list, reading stdin and writing Ogg/Opus to stdout
    fn build_args(input: AudioFormat) -> Vec<String> {
        let rate = STREAM_SAMPLE_RATE.to_string();
        let channels = STREAM_CHANNELS.to_string();
        let frame = STREAM_FRAME_MS.to_string();
        [
            "-loglevel",
            "error",
            "-f",
            Self::input_format(input),
            "-i",
            "pipe:0",
            "-vn",
            "-codec:a",
            "libopus",
            "-ar",
            rate.as_str(),
            "-ac",
            channels.as_str(),
            "-frame_duration",
            frame.as_str(),
            "-application",
            "audio",
            "-b:a",
            "96k",
            "-f",
            "ogg",
            "pipe:1",
        ]
        .iter()
        .map(ToString::to_string)
        .collect()
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    #[instrument(skip(self, audio), fields(input_format = %audio.format(), input_size = audio.size_bytes()))]
    async fn to_stream_codec(&self, audio: &AudioData) -> Result<PlaybackSource, DeliveryError> {
        if audio.is_empty() {
            return Err(DeliveryError::Transcode("no audio to transcode".to_string()));
        }

        let mut child = Command::new(self.ffmpeg_path())
            .args(Self::build_args(audio.format()))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| DeliveryError::Transcode(format!("Failed to spawn FFmpeg: {e}")))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| DeliveryError::Transcode("FFmpeg stdin unavailable".to_string()))?;

        // Feed stdin while draining stdout so large clips cannot fill the pipe
        let feed = async move {
            let result = stdin.write_all(audio.data()).await;
            drop(stdin);
            result
        };
        let (written, output) = tokio::join!(feed, child.wait_with_output());

        let output = output
            .map_err(|e| DeliveryError::Transcode(format!("Failed to wait for FFmpeg: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DeliveryError::Transcode(format!(
                "FFmpeg exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        written
            .map_err(|e| DeliveryError::Transcode(format!("Failed to write to FFmpeg stdin: {e}")))?;

        if output.stdout.is_empty() {
            return Err(DeliveryError::Transcode(
                "FFmpeg produced empty output".to_string(),
            ));
        }

        debug!(output_size = output.stdout.len(), "Transcoding complete");

        Ok(PlaybackSource::Encoded {
            data: Bytes::from(output.stdout),
            format: AudioFormat::Opus,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ffmpeg_path_default() {
        let transcoder = FfmpegTranscoder::new();
        assert_eq!(transcoder.ffmpeg_path(), "ffmpeg");
    }

    #[test]
    fn ffmpeg_path_custom() {
        let transcoder = FfmpegTranscoder::with_ffmpeg_path("/custom/ffmpeg");
        assert_eq!(transcoder.ffmpeg_path(), "/custom/ffmpeg");
    }

    #[test]
    fn input_format_mapping() {
        assert_eq!(FfmpegTranscoder::input_format(AudioFormat::Wav), "wav");
        assert_eq!(FfmpegTranscoder::input_format(AudioFormat::Mp3), "mp3");
        assert_eq!(FfmpegTranscoder::input_format(AudioFormat::Opus), "ogg");
    }

    #[test]
    fn args_request_stereo_48k_opus_in_20ms_frames() {
        let args = FfmpegTranscoder::build_args(AudioFormat::Mp3);
        let joined = args.join(" ");

        assert!(joined.contains("-f mp3 -i pipe:0"));
        assert!(joined.contains("-codec:a libopus"));
        assert!(joined.contains("-ar 48000"));
        assert!(joined.contains("-ac 2"));
        assert!(joined.contains("-frame_duration 20"));
        assert_eq!(args.last().map(String::as_str), Some("pipe:1"));
        assert!(joined.ends_with("-f ogg pipe:1"));
    }

    #[tokio::test]
    async fn is_available_returns_false_for_invalid_path() {
        let transcoder = FfmpegTranscoder::with_ffmpeg_path("/nonexistent/path/to/ffmpeg");
        assert!(!transcoder.is_available().await);
    }

    #[tokio::test]
    async fn missing_ffmpeg_is_transcode_error() {
        let audio = AudioData::new(vec![0, 1, 2, 3], AudioFormat::Mp3);
        let transcoder = FfmpegTranscoder::with_ffmpeg_path("/nonexistent/ffmpeg");

        let result = transcoder.to_stream_codec(&audio).await;

        assert!(matches!(result, Err(DeliveryError::Transcode(_))));
    }

    #[tokio::test]
    async fn empty_audio_is_rejected_without_spawning() {
        let audio = AudioData::new(Vec::new(), AudioFormat::Wav);
        let transcoder = FfmpegTranscoder::with_ffmpeg_path("/nonexistent/ffmpeg");

        let err = transcoder.to_stream_codec(&audio).await.unwrap_err();

        assert!(err.to_string().contains("no audio"));
    }
}
