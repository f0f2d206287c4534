//! Integration tests for speech_synthesis crate
//!
//! Drives the gateway end to end against mocked backend APIs.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use speech_synthesis::{
    AudioFormat, BackendKind, SynthesisConfig, SynthesisError, SynthesisGateway, SynthesisRequest,
};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Configuration with every backend pointed at the mock server
fn test_config(base_url: &str) -> SynthesisConfig {
    SynthesisConfig {
        openai_api_key: Some("sk-test".to_string()),
        openai_base_url: base_url.to_string(),
        elevenlabs_api_key: Some("xi-test".to_string()),
        elevenlabs_base_url: base_url.to_string(),
        google_api_key: Some("g-test".to_string()),
        google_base_url: base_url.to_string(),
        google_sample_rate: Some(16_000.0),
        timeout_ms: 5000,
        ..Default::default()
    }
}

/// Minimal MP3 frame header
fn mock_mp3_audio() -> Vec<u8> {
    vec![0xFF, 0xFB, 0x90, 0x00, 0x00, 0x00, 0x00, 0x00]
}

// ============ Backend routing ============

#[tokio::test]
async fn openai_is_used_by_default() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/audio/speech"))
        .and(header("Authorization", "Bearer sk-test"))
        .and(body_partial_json(serde_json::json!({
            "voice": "nova",
            "response_format": "opus"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"OggS".to_vec()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let gateway = SynthesisGateway::from_config(&test_config(&mock_server.uri())).unwrap();
    let request = SynthesisRequest::new("Hello").with_format(AudioFormat::Opus);

    let audio = gateway.synthesize(&request).await.unwrap();

    assert_eq!(audio.format(), AudioFormat::Opus);
    assert_eq!(audio.data(), b"OggS");
}

#[tokio::test]
async fn switching_to_elevenlabs_reports_mp3_for_wav_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/text-to-speech/voice-abc"))
        .and(header("xi-api-key", "xi-test"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(mock_mp3_audio()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let gateway = SynthesisGateway::from_config(&test_config(&mock_server.uri())).unwrap();
    gateway.select_backend(BackendKind::ElevenLabs);
    gateway.set_default_voice(Some("voice-abc".to_string()));

    let audio = gateway
        .synthesize(&SynthesisRequest::new("Hello").with_format(AudioFormat::Wav))
        .await
        .unwrap();

    assert_eq!(audio.format(), AudioFormat::Mp3);
    assert_eq!(audio.data(), mock_mp3_audio().as_slice());
}

#[tokio::test]
async fn google_wav_uses_configured_sample_rate() {
    let mock_server = MockServer::start().await;
    let samples = vec![0u8; 320];

    Mock::given(method("POST"))
        .and(path("/v1/text:synthesize"))
        .and(body_partial_json(serde_json::json!({
            "voice": { "languageCode": "en-GB", "name": "en-GB-Neural2-B" },
            "audioConfig": { "audioEncoding": "LINEAR16", "sampleRateHertz": 16000 }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "audioContent": BASE64.encode(&samples)
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = SynthesisConfig {
        backend: BackendKind::Google,
        default_format: AudioFormat::Wav,
        default_voice: Some("en-GB-Neural2-B".to_string()),
        ..test_config(&mock_server.uri())
    };
    let gateway = SynthesisGateway::from_config(&config).unwrap();

    let audio = gateway
        .synthesize(&SynthesisRequest::new("Cheers"))
        .await
        .unwrap();

    assert_eq!(audio.format(), AudioFormat::Wav);
    assert_eq!(audio.size_bytes(), 320 + 44);
    assert_eq!(audio.sample_rate(), Some(16_000));
    assert_eq!(&audio.data()[24..28], &16_000u32.to_le_bytes());
}

// ============ Failure mapping ============

#[tokio::test]
async fn server_error_carries_status_but_user_message_is_plain() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/audio/speech"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal trace id=42"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let gateway = SynthesisGateway::from_config(&test_config(&mock_server.uri())).unwrap();

    let err = gateway
        .synthesize(&SynthesisRequest::new("Hello"))
        .await
        .unwrap_err();

    assert!(matches!(err, SynthesisError::Backend { status: 500, .. }));
    assert!(!err.user_message().contains("trace"));
}

#[tokio::test]
async fn selected_backend_without_credential_never_hits_network() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = SynthesisConfig {
        backend: BackendKind::Google,
        google_api_key: None,
        ..test_config(&mock_server.uri())
    };
    let gateway = SynthesisGateway::from_config(&config).unwrap();

    let err = gateway
        .synthesize(&SynthesisRequest::new("Hello"))
        .await
        .unwrap_err();

    assert!(matches!(err, SynthesisError::Configuration(_)));
    assert_eq!(err.user_message(), "Voice playback is not configured right now.");
}

#[tokio::test]
async fn unreachable_backend_is_connection_failure() {
    // Nothing listens on port 9
    let gateway = SynthesisGateway::from_config(&test_config("http://127.0.0.1:9")).unwrap();

    let err = gateway
        .synthesize(&SynthesisRequest::new("Hello"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SynthesisError::ConnectionFailed(_) | SynthesisError::Timeout(_)
    ));
    assert_eq!(
        err.user_message(),
        "The speech service is not reachable at the moment."
    );
}
