//! RIFF/WAVE wrapping for raw PCM output
//!
//! Raw-sample backends hand back bare little-endian 16-bit mono samples.
//! Players need a container, so the samples are prefixed with the classic
//! 44-byte canonical header.

/// Size of the canonical PCM WAV header
pub const WAV_HEADER_LEN: usize = 44;

const CHANNELS: u16 = 1;
const BITS_PER_SAMPLE: u16 = 16;
const BLOCK_ALIGN: u16 = CHANNELS * BITS_PER_SAMPLE / 8;
const PCM_FORMAT_TAG: u16 = 1;

/// Wrap raw 16-bit mono PCM samples in a WAV container
///
/// The result is exactly `samples.len() + 44` bytes. Payloads larger than
/// `u32::MAX - 36` bytes saturate the size fields.
#[must_use]
pub fn wrap_pcm16_mono(samples: &[u8], sample_rate: u32) -> Vec<u8> {
    let data_len = u32::try_from(samples.len()).unwrap_or(u32::MAX - 36);
    let riff_len = data_len.saturating_add(36);
    let byte_rate = sample_rate.saturating_mul(u32::from(BLOCK_ALIGN));

    let mut wav = Vec::with_capacity(WAV_HEADER_LEN + samples.len());

    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&riff_len.to_le_bytes());
    wav.extend_from_slice(b"WAVE");

    wav.extend_from_slice(b"fmt ");
    wav.extend_from_slice(&16u32.to_le_bytes());
    wav.extend_from_slice(&PCM_FORMAT_TAG.to_le_bytes());
    wav.extend_from_slice(&CHANNELS.to_le_bytes());
    wav.extend_from_slice(&sample_rate.to_le_bytes());
    wav.extend_from_slice(&byte_rate.to_le_bytes());
    wav.extend_from_slice(&BLOCK_ALIGN.to_le_bytes());
    wav.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());

    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&data_len.to_le_bytes());
    wav.extend_from_slice(samples);

    wav
}

/// Derive a `xx-YY` locale from a voice name such as `en-US-Neural2-F`
///
/// Voices with fewer than two hyphen-separated segments get `fallback`.
#[must_use]
pub fn resolve_locale(voice: &str, fallback: &str) -> String {
    let mut parts = voice.split('-');
    match (parts.next(), parts.next()) {
        (Some(lang), Some(region)) if !lang.is_empty() && !region.is_empty() => {
            format!("{lang}-{region}")
        },
        _ => fallback.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u16_at(bytes: &[u8], offset: usize) -> u16 {
        u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
    }

    fn u32_at(bytes: &[u8], offset: usize) -> u32 {
        u32::from_le_bytes([
            bytes[offset],
            bytes[offset + 1],
            bytes[offset + 2],
            bytes[offset + 3],
        ])
    }

    #[test]
    fn header_fields_match_mono_16_bit_layout() {
        let samples = vec![0x10u8; 480];
        let wav = wrap_pcm16_mono(&samples, 24_000);

        assert_eq!(wav.len(), 480 + WAV_HEADER_LEN);
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(u32_at(&wav, 4), 480 + 36);
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(&wav[12..16], b"fmt ");
        assert_eq!(u32_at(&wav, 16), 16);
        assert_eq!(u16_at(&wav, 20), 1, "format tag");
        assert_eq!(u16_at(&wav, 22), 1, "channels");
        assert_eq!(u32_at(&wav, 24), 24_000, "sample rate");
        assert_eq!(u32_at(&wav, 28), 48_000, "byte rate");
        assert_eq!(u16_at(&wav, 32), 2, "block align");
        assert_eq!(u16_at(&wav, 34), 16, "bits per sample");
        assert_eq!(&wav[36..40], b"data");
        assert_eq!(u32_at(&wav, 40), 480);
        assert_eq!(&wav[44..], samples.as_slice());
    }

    #[test]
    fn empty_payload_is_header_only() {
        let wav = wrap_pcm16_mono(&[], 16_000);
        assert_eq!(wav.len(), WAV_HEADER_LEN);
        assert_eq!(u32_at(&wav, 40), 0);
        assert_eq!(u32_at(&wav, 4), 36);
    }

    #[test]
    fn locale_from_full_voice_name() {
        assert_eq!(resolve_locale("en-US-Neural2-F", "de-DE"), "en-US");
        assert_eq!(resolve_locale("ja-JP-Wavenet-A", "en-US"), "ja-JP");
        assert_eq!(resolve_locale("en-GB", "en-US"), "en-GB");
    }

    #[test]
    fn locale_falls_back_for_short_voice_names() {
        assert_eq!(resolve_locale("solo", "en-US"), "en-US");
        assert_eq!(resolve_locale("solo", "fr-FR"), "fr-FR");
        assert_eq!(resolve_locale("", "en-US"), "en-US");
        assert_eq!(resolve_locale("-US", "en-US"), "en-US");
    }
}
