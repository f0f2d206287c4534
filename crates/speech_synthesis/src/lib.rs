//! Speech Synthesis - one contract over several text-to-speech backends
//!
//! Turns text into audio bytes plus the container format the backend
//! actually produced:
//! - OpenAI returns exactly the requested container
//! - ElevenLabs always returns MP3
//! - Google Cloud can return raw PCM, which is wrapped in a WAV header
//!
//! # Architecture
//!
//! This crate follows the ports & adapters pattern:
//! - `ports` module defines the `SpeechBackend` trait (port)
//! - `providers` module contains the concrete adapters
//! - `gateway` picks the selected adapter and fills in defaults
//!
//! # Example
//!
//! ```ignore
//! use speech_synthesis::{SynthesisConfig, SynthesisGateway, SynthesisRequest, AudioFormat};
//!
//! let gateway = SynthesisGateway::from_config(&config)?;
//!
//! let request = SynthesisRequest::new("Hello, world!").with_format(AudioFormat::Wav);
//! let audio = gateway.synthesize(&request).await?;
//! println!("Got {} bytes of {}", audio.size_bytes(), audio.format());
//! ```

pub mod config;
pub mod error;
pub mod gateway;
pub mod ports;
pub mod providers;
pub mod types;
pub mod wav;

pub use config::SynthesisConfig;
pub use error::SynthesisError;
pub use gateway::{Selection, SynthesisGateway};
pub use ports::SpeechBackend;
pub use providers::{ElevenLabsBackend, GoogleBackend, OpenAIBackend};
pub use types::{AudioData, AudioFormat, BackendKind, SynthesisRequest};
