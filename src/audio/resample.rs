//! Offline resampling of a decoded buffer to the target sample rate.
//!
//! Wraps rubato's `SincFixedIn<f32>` in a batch (non-realtime) rendering
//! pass. The contract is exact: for a source of `n` frames at rate `r`,
//! the output has `ceil(n * target / r)` frames per channel, matching the
//! duration-based frame count of an offline rendering context.
//!
//! The sinc stage has an inherent output delay; the pass feeds the whole
//! source (zero-padding the final block), flushes the filter tail, trims
//! the reported delay from the front, and takes exactly the expected frame
//! count. A source already at the target rate bypasses the stage entirely,
//! so a no-op resample introduces no distortion.

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

use crate::audio::normalizer::AudioError;
use crate::audio::SourceAudio;

/// Block size fed to the sinc stage per process call.
const RENDER_CHUNK_FRAMES: usize = 1024;

/// Number of frames the output must contain for the given source.
pub fn expected_frames(source_frames: usize, source_rate: u32, target_rate: u32) -> usize {
    (source_frames as f64 * target_rate as f64 / source_rate as f64).ceil() as usize
}

/// Render `source` into a new buffer at `target_rate`, preserving channels.
pub fn render_offline(source: &SourceAudio, target_rate: u32) -> Result<SourceAudio, AudioError> {
    if target_rate == 0 {
        return Err(AudioError::Render(
            "target sample rate must be > 0".to_string(),
        ));
    }

    // Identity pass: same rate in and out, sample data untouched.
    if source.sample_rate() == target_rate {
        return Ok(source.clone());
    }

    let channel_count = source.channel_count();
    let frames = source.frames();
    let expected = expected_frames(frames, source.sample_rate(), target_rate);

    if frames == 0 {
        let empty = vec![Vec::new(); channel_count];
        return SourceAudio::new(target_rate, empty).map_err(AudioError::Render);
    }

    let ratio = target_rate as f64 / source.sample_rate() as f64;
    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };
    let mut resampler =
        SincFixedIn::<f32>::new(ratio, 2.0, params, RENDER_CHUNK_FRAMES, channel_count)
            .map_err(|e| AudioError::Render(format!("failed to create resampler: {e}")))?;

    let delay = resampler.output_delay();
    let mut rendered: Vec<Vec<f32>> = (0..channel_count)
        .map(|_| Vec::with_capacity(expected + delay))
        .collect();

    // Feed the full source in fixed-size blocks, zero-padding the last one.
    let mut pos = 0;
    while pos < frames {
        let need = resampler.input_frames_next();
        let end = (pos + need).min(frames);
        let block: Vec<Vec<f32>> = source
            .channels()
            .iter()
            .map(|channel| {
                let mut chunk = channel[pos..end].to_vec();
                chunk.resize(need, 0.0);
                chunk
            })
            .collect();

        let out = resampler
            .process(&block, None)
            .map_err(|e| AudioError::Render(format!("resampling failed: {e}")))?;
        for (collected, channel_out) in rendered.iter_mut().zip(out) {
            collected.extend_from_slice(&channel_out);
        }
        pos += need;
    }

    // Flush the filter tail until the delay plus every expected frame is out.
    while rendered[0].len() < delay + expected {
        let out = resampler
            .process_partial(None::<&[Vec<f32>]>, None)
            .map_err(|e| AudioError::Render(format!("resampler flush failed: {e}")))?;
        if out.first().map_or(true, |c| c.is_empty()) {
            break;
        }
        for (collected, channel_out) in rendered.iter_mut().zip(out) {
            collected.extend_from_slice(&channel_out);
        }
    }

    let channels: Vec<Vec<f32>> = rendered
        .into_iter()
        .map(|collected| {
            let mut trimmed: Vec<f32> =
                collected.into_iter().skip(delay).take(expected).collect();
            trimmed.resize(expected, 0.0);
            trimmed
        })
        .collect();

    SourceAudio::new(target_rate, channels).map_err(AudioError::Render)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(rate: u32, frames: usize, freq: f32, amplitude: f32) -> Vec<f32> {
        (0..frames)
            .map(|i| amplitude * (2.0 * std::f32::consts::PI * freq * i as f32 / rate as f32).sin())
            .collect()
    }

    #[test]
    fn test_expected_frames() {
        assert_eq!(expected_frames(8000, 8000, 16000), 16000);
        assert_eq!(expected_frames(44100, 44100, 16000), 16000);
        // 0.5s at 44.1kHz: ceil(22050 * 16000 / 44100) = 8000
        assert_eq!(expected_frames(22050, 44100, 16000), 8000);
        // Non-integral: ceil(1000 * 16000 / 44100) = ceil(362.8...) = 363
        assert_eq!(expected_frames(1000, 44100, 16000), 363);
        assert_eq!(expected_frames(0, 44100, 16000), 0);
    }

    #[test]
    fn test_upsample_8k_to_16k_exact_frame_count() {
        let source = SourceAudio::new(8000, vec![sine(8000, 8000, 440.0, 1.0)]).unwrap();
        let out = render_offline(&source, 16000).unwrap();
        assert_eq!(out.sample_rate(), 16000);
        assert_eq!(out.channel_count(), 1);
        assert_eq!(out.frames(), 16000);
    }

    #[test]
    fn test_downsample_44k_to_16k_exact_frame_count() {
        let source = SourceAudio::new(44100, vec![sine(44100, 22050, 440.0, 0.8)]).unwrap();
        let out = render_offline(&source, 16000).unwrap();
        assert_eq!(out.frames(), 8000);
    }

    #[test]
    fn test_same_rate_is_identity() {
        let samples = sine(16000, 1600, 440.0, 0.5);
        let source = SourceAudio::new(16000, vec![samples.clone()]).unwrap();
        let out = render_offline(&source, 16000).unwrap();
        assert_eq!(out.channels()[0], samples);
    }

    #[test]
    fn test_channel_count_preserved() {
        let left = sine(48000, 4800, 440.0, 0.6);
        let right = sine(48000, 4800, 880.0, 0.6);
        let source = SourceAudio::new(48000, vec![left, right]).unwrap();
        let out = render_offline(&source, 16000).unwrap();
        assert_eq!(out.channel_count(), 2);
        assert_eq!(out.frames(), 1600);
    }

    #[test]
    fn test_empty_source() {
        let source = SourceAudio::new(44100, vec![Vec::new()]).unwrap();
        let out = render_offline(&source, 16000).unwrap();
        assert_eq!(out.frames(), 0);
        assert_eq!(out.sample_rate(), 16000);
    }

    #[test]
    fn test_zero_target_rate_is_render_error() {
        let source = SourceAudio::new(8000, vec![vec![0.0; 100]]).unwrap();
        assert!(matches!(
            render_offline(&source, 0),
            Err(AudioError::Render(_))
        ));
    }

    #[test]
    fn test_resampled_signal_is_not_silence() {
        // A full-scale sine must survive resampling with comparable energy.
        let source = SourceAudio::new(8000, vec![sine(8000, 8000, 440.0, 1.0)]).unwrap();
        let out = render_offline(&source, 16000).unwrap();
        let peak = out.channels()[0]
            .iter()
            .fold(0.0f32, |acc, s| acc.max(s.abs()));
        assert!(peak > 0.8, "peak amplitude collapsed to {peak}");
    }
}
