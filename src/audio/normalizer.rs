//! The single-shot normalization pipeline: decode → resample → encode.
//!
//! All failures are terminal for the call and typed; no partial or corrupt
//! WAV buffer is ever returned. Retrying (e.g. asking the user to
//! re-record) is the caller's responsibility.

use thiserror::Error;

use crate::audio::{decode, resample, wav};

/// Sample rate expected by the downstream speech-recognition service.
pub const TARGET_SAMPLE_RATE: u32 = 16_000;

/// Error taxonomy for the normalization pipeline.
#[derive(Debug, Error)]
pub enum AudioError {
    /// The input byte stream is not a recognized/decodable audio container.
    #[error("audio decode failed: {0}")]
    Decode(String),

    /// The resampling/rendering pass failed.
    #[error("audio render failed: {0}")]
    Render(String),
}

/// Convert an arbitrary platform-decodable recording into a canonical
/// `target_sample_rate` (default 16 kHz), 16-bit PCM WAV byte stream.
///
/// ## Guarantees:
/// - the returned bytes are a complete, independently parseable WAV file
/// - channel count is preserved; frame count is
///   `ceil(source_duration_seconds * target_sample_rate)`
/// - pure function over its inputs: no I/O, no shared state
pub fn convert_to_canonical_wav(
    input: &[u8],
    target_sample_rate: u32,
) -> Result<Vec<u8>, AudioError> {
    if target_sample_rate == 0 {
        return Err(AudioError::Render(
            "target sample rate must be a positive integer".to_string(),
        ));
    }

    let source = decode::decode_bytes(input)?;
    let rendered = resample::render_offline(&source, target_sample_rate)?;
    Ok(wav::encode_pcm16(&rendered))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::wav::{quantize, WavHeader, HEADER_LEN};
    use crate::audio::SourceAudio;

    fn sine(rate: u32, frames: usize, freq: f32, amplitude: f32) -> Vec<f32> {
        (0..frames)
            .map(|i| amplitude * (2.0 * std::f32::consts::PI * freq * i as f32 / rate as f32).sin())
            .collect()
    }

    fn wav_bytes(rate: u32, channels: Vec<Vec<f32>>) -> Vec<u8> {
        crate::audio::wav::encode_pcm16(&SourceAudio::new(rate, channels).unwrap())
    }

    #[test]
    fn test_one_second_8k_sine_scenario() {
        // 1 second, 8 kHz, mono, peak amplitude 1.0 must produce exactly
        // 44 + 16000*2 = 32044 bytes with the canonical header fields.
        let input = wav_bytes(8000, vec![sine(8000, 8000, 440.0, 1.0)]);
        let out = convert_to_canonical_wav(&input, TARGET_SAMPLE_RATE).unwrap();

        assert_eq!(out.len(), 32_044);
        let header = WavHeader::parse(&out).unwrap();
        assert_eq!(header.channels, 1);
        assert_eq!(header.sample_rate, 16000);
        assert_eq!(header.byte_rate, 32000);
        assert_eq!(header.block_align, 2);
        assert_eq!(header.bits_per_sample, 16);
        assert_eq!(header.data_len, 32000);
    }

    #[test]
    fn test_garbage_input_fails_with_decode_error() {
        let garbage: Vec<u8> = (0..256).map(|i| (i * 7 % 251) as u8).collect();
        let err = convert_to_canonical_wav(&garbage, TARGET_SAMPLE_RATE).unwrap_err();
        assert!(matches!(err, AudioError::Decode(_)));
    }

    #[test]
    fn test_stereo_source_produces_stereo_wav() {
        let input = wav_bytes(
            48000,
            vec![sine(48000, 24000, 440.0, 0.5), sine(48000, 24000, 880.0, 0.5)],
        );
        let out = convert_to_canonical_wav(&input, TARGET_SAMPLE_RATE).unwrap();
        let header = WavHeader::parse(&out).unwrap();
        assert_eq!(header.channels, 2);
        assert_eq!(header.block_align, 4);
        // 0.5s at 16kHz, two channels
        assert_eq!(header.frames(), 8000);
    }

    #[test]
    fn test_no_op_resample_is_bit_identical_to_direct_quantization() {
        // A 16kHz mono source converts with data bit-identical to directly
        // quantizing its decoded samples.
        let input = wav_bytes(16000, vec![sine(16000, 3200, 440.0, 0.9)]);
        let decoded = crate::audio::decode::decode_bytes(&input).unwrap();

        let out = convert_to_canonical_wav(&input, TARGET_SAMPLE_RATE).unwrap();
        let expected: Vec<u8> = decoded.channels()[0]
            .iter()
            .flat_map(|&s| quantize(s).to_le_bytes())
            .collect();
        assert_eq!(&out[HEADER_LEN..], &expected[..]);
    }

    #[test]
    fn test_zero_target_rate_rejected() {
        let input = wav_bytes(16000, vec![vec![0.0; 16]]);
        assert!(matches!(
            convert_to_canonical_wav(&input, 0),
            Err(AudioError::Render(_))
        ));
    }

    #[test]
    fn test_non_default_target_rate() {
        let input = wav_bytes(16000, vec![sine(16000, 16000, 440.0, 0.5)]);
        let out = convert_to_canonical_wav(&input, 8000).unwrap();
        let header = WavHeader::parse(&out).unwrap();
        assert_eq!(header.sample_rate, 8000);
        assert_eq!(header.frames(), 8000);
    }
}
