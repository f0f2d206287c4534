//! Port definitions for speech synthesis
//!
//! Defines the trait every synthesis backend adapter implements.

use async_trait::async_trait;

use crate::error::SynthesisError;
use crate::types::{AudioData, AudioFormat, BackendKind, SynthesisRequest};

/// Port for a text-to-speech backend
///
/// Implementations translate a normalized request into the provider's wire
/// protocol and map its responses and failures back.
///
/// # Example
///
/// ```ignore
/// use speech_synthesis::{SpeechBackend, SynthesisRequest, AudioFormat};
///
/// async fn speak(backend: &impl SpeechBackend) -> Result<usize, SynthesisError> {
///     let request = SynthesisRequest::new("Hello there");
///     let audio = backend.synthesize(&request, "nova", AudioFormat::Mp3).await?;
///     Ok(audio.size_bytes())
/// }
/// ```
#[async_trait]
pub trait SpeechBackend: Send + Sync {
    /// Synthesize speech
    ///
    /// # Arguments
    ///
    /// * `request` - Text and optional persona hint
    /// * `voice` - Resolved voice identifier
    /// * `format` - Preferred output container
    ///
    /// # Returns
    ///
    /// Returns `AudioData` whose format is the one the backend produced,
    /// which may differ from `format`.
    ///
    /// # Errors
    ///
    /// Returns `SynthesisError` if the request is rejected or fails.
    async fn synthesize(
        &self,
        request: &SynthesisRequest,
        voice: &str,
        format: AudioFormat,
    ) -> Result<AudioData, SynthesisError>;

    /// Which backend this adapter talks to
    fn kind(&self) -> BackendKind;

    /// Voice used when neither the request nor the configuration names one
    fn builtin_voice(&self) -> &'static str;
}

/// Reject text no backend can speak
///
/// # Errors
///
/// Returns `SynthesisError::InvalidInput` for blank or oversized text.
pub fn check_text(text: &str, max_len: usize) -> Result<(), SynthesisError> {
    if text.trim().is_empty() {
        return Err(SynthesisError::InvalidInput(
            "Text cannot be empty".to_string(),
        ));
    }
    if text.len() > max_len {
        return Err(SynthesisError::InvalidInput(format!(
            "Text too long: {} bytes exceeds {max_len} limit",
            text.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoBackend;

    #[async_trait]
    impl SpeechBackend for EchoBackend {
        async fn synthesize(
            &self,
            request: &SynthesisRequest,
            _voice: &str,
            format: AudioFormat,
        ) -> Result<AudioData, SynthesisError> {
            check_text(&request.text, 16)?;
            Ok(AudioData::new(request.text.as_bytes().to_vec(), format))
        }

        fn kind(&self) -> BackendKind {
            BackendKind::OpenAI
        }

        fn builtin_voice(&self) -> &'static str {
            "echo"
        }
    }

    #[tokio::test]
    async fn backend_can_be_used_as_trait_object() {
        let backend: Box<dyn SpeechBackend> = Box::new(EchoBackend);
        let request = SynthesisRequest::new("hi");

        let audio = backend
            .synthesize(&request, backend.builtin_voice(), AudioFormat::Wav)
            .await
            .unwrap();

        assert_eq!(audio.data(), b"hi");
        assert_eq!(audio.format(), AudioFormat::Wav);
    }

    #[test]
    fn check_text_rejects_blank_text() {
        assert!(matches!(
            check_text("  \n", 100),
            Err(SynthesisError::InvalidInput(_))
        ));
    }

    #[test]
    fn check_text_rejects_oversized_text() {
        let err = check_text(&"a".repeat(11), 10).unwrap_err();
        assert!(err.to_string().contains("exceeds 10"));
    }

    #[test]
    fn check_text_accepts_text_at_limit() {
        assert!(check_text(&"a".repeat(10), 10).is_ok());
    }
}
