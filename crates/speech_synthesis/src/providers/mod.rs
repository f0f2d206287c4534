//! Speech backend implementations
//!
//! Contains the concrete adapters behind the `SpeechBackend` trait.

pub mod elevenlabs;
pub mod google;
pub mod openai;

pub use elevenlabs::ElevenLabsBackend;
pub use google::GoogleBackend;
pub use openai::OpenAIBackend;
