//! voicecast CLI
//!
//! Offline synthesis, debug dumps and runtime voice administration.

#![allow(clippy::print_stdout)]

mod config;
mod offline;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use speech_synthesis::{AudioFormat, BackendKind, SynthesisGateway, SynthesisRequest};
use tracing::{error, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use voice_delivery::{FfmpegTranscoder, VoiceDeliveryPipeline};
use voice_service::{DumpRequest, SettingsStore, VoiceService};

use crate::config::AppConfig;
use crate::offline::OfflineTransport;

/// voicecast CLI
#[derive(Parser)]
#[command(name = "voicecast")]
#[command(author, version, about = "Text-to-speech for voice channels", long_about = None)]
struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Configuration file (default: ./voicecast.toml if present)
    #[arg(short, long, env = "VOICECAST_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show backend, voice, credentials and sessions
    Status,

    /// Synthesize text into an audio file
    ///
    /// Example: voicecast synthesize "Hello there" --format wav
    Synthesize {
        /// Text to speak
        text: String,

        /// Output file (default: speech.<ext> for the produced format)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Voice identifier for the selected backend
        #[arg(long)]
        voice: Option<String>,

        /// Preferred container: wav, mp3 or opus
        #[arg(short, long)]
        format: Option<AudioFormat>,

        /// Persona/style hint
        #[arg(long)]
        persona: Option<String>,
    },

    /// Synthesize a reply and keep audio plus metadata in the debug directory
    Dump {
        /// Text to speak
        reply_text: String,

        /// Who asked for the reply
        #[arg(long, default_value = "cli")]
        requester: String,

        /// Prompt the reply was generated from
        #[arg(long, default_value = "")]
        prompt: String,

        #[arg(long)]
        persona: Option<String>,

        #[arg(long)]
        voice: Option<String>,

        #[arg(short, long)]
        format: Option<AudioFormat>,
    },

    /// Switch the synthesis backend (openai, elevenlabs, google)
    SetBackend {
        backend: BackendKind,
    },

    /// Set the default voice; omit to reset to the backend default
    SetVoice {
        voice: Option<String>,
    },

    /// Check that FFmpeg can be launched
    CheckFfmpeg,
}

/// Determine log filter level from verbosity count
const fn log_filter_from_verbosity(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// File name used when `synthesize` gets no `--output`
fn default_output(format: AudioFormat) -> PathBuf {
    PathBuf::from(format!("speech.{}", format.extension()))
}

fn transcoder(config: &AppConfig) -> FfmpegTranscoder {
    config
        .ffmpeg_path
        .as_deref()
        .map_or_else(FfmpegTranscoder::new, |path| {
            FfmpegTranscoder::with_ffmpeg_path(path)
        })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over -v
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_filter_from_verbosity(cli.verbose)));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load(cli.config.as_deref())?;
    if let Err(e) = config.validate() {
        println!("❌ Invalid configuration: {e}");
        std::process::exit(1);
    }

    let gateway = Arc::new(SynthesisGateway::from_config(&config.speech)?);
    let pipeline = Arc::new(VoiceDeliveryPipeline::new(
        Arc::new(OfflineTransport),
        Arc::new(transcoder(&config)),
        config.delivery.clone(),
    ));
    let service = VoiceService::new(
        Arc::clone(&gateway),
        pipeline,
        SettingsStore::new(&config.settings_path),
        &config.debug_dir,
    );

    match cli.command {
        Commands::Status => println!("{}", service.status()),

        Commands::Synthesize {
            text,
            output,
            voice,
            format,
            persona,
        } => {
            let request = SynthesisRequest {
                text,
                voice,
                format,
                persona,
            };

            let audio = match gateway.synthesize(&request).await {
                Ok(audio) => audio,
                Err(e) => {
                    error!(error = %e, "Synthesis failed");
                    println!("❌ {}", e.user_message());
                    std::process::exit(1);
                },
            };

            let path = output.unwrap_or_else(|| default_output(audio.format()));
            warn_on_extension_mismatch(&path, audio.format());
            tokio::fs::write(&path, audio.data()).await?;

            println!(
                "✅ Wrote {} bytes of {} to {}",
                audio.size_bytes(),
                audio.format(),
                path.display()
            );
        },

        Commands::Dump {
            reply_text,
            requester,
            prompt,
            persona,
            voice,
            format,
        } => {
            let request = DumpRequest {
                requester_id: requester,
                prompt,
                persona,
                reply_text,
                voice,
                format,
            };

            match service.debug_dump(request).await {
                Ok(artifact) => {
                    println!("✅ Debug dump written");
                    println!("   🔊 Audio: {}", artifact.audio_path.display());
                    println!("   📋 Metadata: {}", artifact.metadata_path.display());
                },
                Err(e) => {
                    error!(error = %e, "Debug dump failed");
                    println!("❌ {}", e.user_message());
                    std::process::exit(1);
                },
            }
        },

        Commands::SetBackend { backend } => println!("{}", service.set_backend(backend)),

        Commands::SetVoice { voice } => println!("{}", service.set_voice(voice)),

        Commands::CheckFfmpeg => {
            if transcoder(&config).is_available().await {
                println!("✅ FFmpeg is available");
            } else {
                println!("❌ FFmpeg could not be launched");
                std::process::exit(1);
            }
        },
    }

    Ok(())
}

fn warn_on_extension_mismatch(path: &Path, format: AudioFormat) {
    let extension = path.extension().and_then(|e| e.to_str());
    if extension.is_some_and(|e| !e.eq_ignore_ascii_case(format.extension())) {
        warn!(
            path = %path.display(),
            produced = %format,
            "Output extension does not match the produced format"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_filter_verbosity_zero() {
        assert_eq!(log_filter_from_verbosity(0), "warn");
    }

    #[test]
    fn log_filter_verbosity_one() {
        assert_eq!(log_filter_from_verbosity(1), "info");
    }

    #[test]
    fn log_filter_verbosity_two() {
        assert_eq!(log_filter_from_verbosity(2), "debug");
    }

    #[test]
    fn log_filter_verbosity_three_or_more() {
        assert_eq!(log_filter_from_verbosity(3), "trace");
        assert_eq!(log_filter_from_verbosity(10), "trace");
    }

    #[test]
    fn default_output_follows_produced_format() {
        assert_eq!(default_output(AudioFormat::Mp3), PathBuf::from("speech.mp3"));
        assert_eq!(default_output(AudioFormat::Opus), PathBuf::from("speech.ogg"));
    }

    #[test]
    fn cli_parses_backend_names() {
        let cli = Cli::try_parse_from(["voicecast", "set-backend", "ElevenLabs"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::SetBackend {
                backend: BackendKind::ElevenLabs
            }
        ));
    }

    #[test]
    fn cli_rejects_unknown_format() {
        assert!(Cli::try_parse_from(["voicecast", "synthesize", "hi", "--format", "flac"]).is_err());
    }

    #[test]
    fn set_voice_without_argument_resets() {
        let cli = Cli::try_parse_from(["voicecast", "-vv", "set-voice"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Commands::SetVoice { voice: None }));
    }
}
