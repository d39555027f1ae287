//! # Audio Normalization Module
//!
//! Converts captured audio recordings of arbitrary container/codec, sample
//! rate, and channel count into the canonical form expected by the
//! speech-recognition service: 16 kHz, 16-bit PCM, RIFF/WAVE.
//!
//! ## Pipeline:
//! - **Decode** (`decode`): container/codec handling is delegated to
//!   symphonia; output is a [`SourceAudio`] buffer of per-channel f32
//!   samples in [-1.0, 1.0]
//! - **Resample** (`resample`): offline rendering pass to the target rate,
//!   preserving channel count
//! - **Encode** (`wav`): serialize to a complete RIFF/WAVE byte stream
//!
//! The pipeline is a single-shot pure function per call: no shared state,
//! no locks, and no partial output on failure. Each invocation allocates
//! its own buffers, so concurrent calls are independent.

pub mod decode;
pub mod normalizer;
pub mod resample;
pub mod wav;

pub use normalizer::{convert_to_canonical_wav, AudioError, TARGET_SAMPLE_RATE};

/// A decoded audio buffer: one `Vec<f32>` per channel, all the same length.
///
/// Samples are normalized floating-point amplitudes in [-1.0, 1.0]. The
/// buffer is created by the decoder, consumed once by the resampler, and
/// discarded after encoding; nothing outlives a single conversion call.
#[derive(Debug, Clone)]
pub struct SourceAudio {
    sample_rate: u32,
    channels: Vec<Vec<f32>>,
}

impl SourceAudio {
    /// Build a buffer from per-channel sample arrays.
    ///
    /// Fails if the sample rate is zero, there are no channels, or the
    /// channels disagree on frame count.
    pub fn new(sample_rate: u32, channels: Vec<Vec<f32>>) -> Result<Self, String> {
        if sample_rate == 0 {
            return Err("sample rate must be > 0".to_string());
        }
        if channels.is_empty() {
            return Err("audio must have at least one channel".to_string());
        }
        let frames = channels[0].len();
        if channels.iter().any(|c| c.len() != frames) {
            return Err("all channels must have identical frame counts".to_string());
        }
        Ok(Self {
            sample_rate,
            channels,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Frame count (samples per channel).
    pub fn frames(&self) -> usize {
        self.channels[0].len()
    }

    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }

    pub fn duration_seconds(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_audio_invariants() {
        assert!(SourceAudio::new(16000, vec![vec![0.0; 8]]).is_ok());
        assert!(SourceAudio::new(0, vec![vec![0.0; 8]]).is_err());
        assert!(SourceAudio::new(16000, vec![]).is_err());
        // Mismatched channel lengths are rejected
        assert!(SourceAudio::new(16000, vec![vec![0.0; 8], vec![0.0; 7]]).is_err());
    }

    #[test]
    fn test_duration() {
        let audio = SourceAudio::new(8000, vec![vec![0.0; 4000]]).unwrap();
        assert!((audio.duration_seconds() - 0.5).abs() < 1e-9);
    }
}
