//! Canonical RIFF/WAVE serialization for linear PCM16.
//!
//! ## Header layout (all multi-byte integers little-endian):
//! - bytes 0–3: `"RIFF"`, bytes 4–7: u32 = 36 + data length
//! - bytes 8–11: `"WAVE"`, bytes 12–15: `"fmt "`, bytes 16–19: u32 = 16
//! - bytes 20–21: u16 = 1 (PCM), bytes 22–23: u16 channel count
//! - bytes 24–27: u32 sample rate, bytes 28–31: u32 byte rate
//! - bytes 32–33: u16 block align, bytes 34–35: u16 = 16 bits per sample
//! - bytes 36–39: `"data"`, bytes 40–43: u32 data length
//! - bytes 44…: interleaved int16 samples, channel-major within each frame
//!
//! ## Quantization rule (must hold bit-for-bit):
//! each float sample is clamped to [-1.0, 1.0], then
//! `s < 0 ? round(s * 32768) : round(s * 32767)`. The asymmetric scaling
//! avoids overflow at +1.0 while using the full negative range at -1.0.

use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt};

use crate::audio::SourceAudio;

/// Size of the fixed RIFF/fmt/data header in bytes.
pub const HEADER_LEN: usize = 44;

const BYTES_PER_SAMPLE: usize = 2;

/// Quantize one float sample to int16 per the canonical rule.
pub fn quantize(sample: f32) -> i16 {
    let s = sample.clamp(-1.0, 1.0);
    if s < 0.0 {
        (s * 32768.0).round() as i16
    } else {
        (s * 32767.0).round() as i16
    }
}

/// Serialize a buffer into a complete, independently parseable WAV file.
pub fn encode_pcm16(audio: &SourceAudio) -> Vec<u8> {
    let channel_count = audio.channel_count() as u16;
    let sample_rate = audio.sample_rate();
    let frames = audio.frames();

    let block_align = channel_count * BYTES_PER_SAMPLE as u16;
    let byte_rate = sample_rate * u32::from(block_align);
    let data_len = (frames * channel_count as usize * BYTES_PER_SAMPLE) as u32;

    let mut buf = Vec::with_capacity(HEADER_LEN + data_len as usize);

    // RIFF chunk
    buf.extend_from_slice(b"RIFF");
    buf.extend_from_slice(&(36 + data_len).to_le_bytes());
    buf.extend_from_slice(b"WAVE");

    // fmt sub-chunk
    buf.extend_from_slice(b"fmt ");
    buf.extend_from_slice(&16u32.to_le_bytes());
    buf.extend_from_slice(&1u16.to_le_bytes()); // PCM format tag
    buf.extend_from_slice(&channel_count.to_le_bytes());
    buf.extend_from_slice(&sample_rate.to_le_bytes());
    buf.extend_from_slice(&byte_rate.to_le_bytes());
    buf.extend_from_slice(&block_align.to_le_bytes());
    buf.extend_from_slice(&16u16.to_le_bytes()); // bits per sample

    // data sub-chunk, channel-major within each frame
    buf.extend_from_slice(b"data");
    buf.extend_from_slice(&data_len.to_le_bytes());
    for frame in 0..frames {
        for channel in audio.channels() {
            buf.extend_from_slice(&quantize(channel[frame]).to_le_bytes());
        }
    }

    buf
}

/// Parsed view of the fixed 44-byte canonical header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WavHeader {
    pub channels: u16,
    pub sample_rate: u32,
    pub byte_rate: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
    pub data_len: u32,
}

impl WavHeader {
    /// Parse the canonical header produced by [`encode_pcm16`].
    pub fn parse(bytes: &[u8]) -> Result<Self, String> {
        if bytes.len() < HEADER_LEN {
            return Err(format!("buffer too short for WAV header: {}", bytes.len()));
        }
        if &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
            return Err("missing RIFF/WAVE magic".to_string());
        }
        if &bytes[12..16] != b"fmt " || &bytes[36..40] != b"data" {
            return Err("missing fmt/data sub-chunks".to_string());
        }

        let mut cursor = Cursor::new(&bytes[16..]);
        let read = |c: &mut Cursor<&[u8]>, what: &str| -> Result<u32, String> {
            c.read_u32::<LittleEndian>()
                .map_err(|e| format!("failed to read {what}: {e}"))
        };
        let read16 = |c: &mut Cursor<&[u8]>, what: &str| -> Result<u16, String> {
            c.read_u16::<LittleEndian>()
                .map_err(|e| format!("failed to read {what}: {e}"))
        };

        let fmt_len = read(&mut cursor, "fmt length")?;
        if fmt_len != 16 {
            return Err(format!("unexpected fmt chunk size {fmt_len}"));
        }
        let format_tag = read16(&mut cursor, "format tag")?;
        if format_tag != 1 {
            return Err(format!("not linear PCM (format tag {format_tag})"));
        }
        let channels = read16(&mut cursor, "channel count")?;
        let sample_rate = read(&mut cursor, "sample rate")?;
        let byte_rate = read(&mut cursor, "byte rate")?;
        let block_align = read16(&mut cursor, "block align")?;
        let bits_per_sample = read16(&mut cursor, "bits per sample")?;

        let mut data_cursor = Cursor::new(&bytes[40..]);
        let data_len = read(&mut data_cursor, "data length")?;

        Ok(Self {
            channels,
            sample_rate,
            byte_rate,
            block_align,
            bits_per_sample,
            data_len,
        })
    }

    /// Frame count declared by the header.
    pub fn frames(&self) -> u32 {
        if self.block_align == 0 {
            0
        } else {
            self.data_len / u32::from(self.block_align)
        }
    }

    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            0.0
        } else {
            f64::from(self.frames()) / f64::from(self.sample_rate)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mono(rate: u32, samples: Vec<f32>) -> SourceAudio {
        SourceAudio::new(rate, vec![samples]).unwrap()
    }

    /// Read back the int16 data section of an encoded buffer.
    fn data_samples(bytes: &[u8]) -> Vec<i16> {
        let mut cursor = Cursor::new(&bytes[HEADER_LEN..]);
        let mut out = Vec::new();
        while let Ok(sample) = cursor.read_i16::<LittleEndian>() {
            out.push(sample);
        }
        out
    }

    #[test]
    fn test_header_correctness() {
        let bytes = encode_pcm16(&mono(16000, vec![0.0; 160]));
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");
        assert_eq!(&bytes[12..16], b"fmt ");
        assert_eq!(&bytes[36..40], b"data");

        let header = WavHeader::parse(&bytes).unwrap();
        assert_eq!(header.channels, 1);
        assert_eq!(header.sample_rate, 16000);
        assert_eq!(header.byte_rate, 32000);
        assert_eq!(header.block_align, 2);
        assert_eq!(header.bits_per_sample, 16);
        assert_eq!(header.data_len, 320);
        // Declared RIFF chunk size is 36 + data length
        let riff_len = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        assert_eq!(riff_len, 36 + header.data_len);
        assert_eq!(bytes.len(), HEADER_LEN + header.data_len as usize);
    }

    #[test]
    fn test_quantize_clamping() {
        // Out-of-range inputs encode identically to the range endpoints
        assert_eq!(quantize(1.5), quantize(1.0));
        assert_eq!(quantize(1.0), 32767);
        assert_eq!(quantize(-1.5), quantize(-1.0));
        assert_eq!(quantize(-1.0), -32768);
        assert_eq!(quantize(0.0), 0);
    }

    #[test]
    fn test_quantize_asymmetric_scaling() {
        assert_eq!(quantize(0.5), (0.5f32 * 32767.0).round() as i16);
        assert_eq!(quantize(-0.5), (-0.5f32 * 32768.0).round() as i16);
    }

    #[test]
    fn test_round_trip_amplitude_fidelity() {
        // Decoding per the quantization rule reproduces every sample within
        // one quantization step of 1/32767.
        let samples: Vec<f32> = (0..2001).map(|i| (i as f32 - 1000.0) / 1000.0).collect();
        let bytes = encode_pcm16(&mono(16000, samples.clone()));
        let decoded = data_samples(&bytes);
        assert_eq!(decoded.len(), samples.len());
        for (&original, &q) in samples.iter().zip(decoded.iter()) {
            let restored = if q < 0 {
                f32::from(q) / 32768.0
            } else {
                f32::from(q) / 32767.0
            };
            assert!(
                (original - restored).abs() <= 1.0 / 32767.0,
                "sample {original} restored as {restored}"
            );
        }
    }

    #[test]
    fn test_stereo_interleaving_and_block_align() {
        let left = vec![0.25f32; 4];
        let right = vec![-0.25f32; 4];
        let audio = SourceAudio::new(16000, vec![left, right]).unwrap();
        let bytes = encode_pcm16(&audio);

        let header = WavHeader::parse(&bytes).unwrap();
        assert_eq!(header.channels, 2);
        assert_eq!(header.block_align, 4);
        assert_eq!(header.byte_rate, 64000);
        assert_eq!(header.frames(), 4);

        // Frame 0 channel 0, frame 0 channel 1, frame 1 channel 0, ...
        let data = data_samples(&bytes);
        let l = quantize(0.25);
        let r = quantize(-0.25);
        assert_eq!(data, vec![l, r, l, r, l, r, l, r]);
    }

    #[test]
    fn test_empty_buffer_is_header_only() {
        let bytes = encode_pcm16(&mono(16000, Vec::new()));
        assert_eq!(bytes.len(), HEADER_LEN);
        let header = WavHeader::parse(&bytes).unwrap();
        assert_eq!(header.data_len, 0);
        assert_eq!(header.frames(), 0);
    }

    #[test]
    fn test_parse_rejects_non_wav() {
        assert!(WavHeader::parse(b"not a wav file, nowhere near").is_err());
        assert!(WavHeader::parse(&[]).is_err());
    }
}
