//! Decoding captured audio bytes into a [`SourceAudio`] buffer.
//!
//! Container probing and codec selection are delegated to symphonia, so the
//! normalizer accepts whatever the capture side produced (WAV, Ogg/Opus,
//! MP3, MP4/AAC, FLAC, WebM, ...). Anything symphonia cannot probe or
//! decode fails the whole conversion with [`AudioError::Decode`]; no
//! partial buffer is ever returned.

use std::io::Cursor;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::audio::normalizer::AudioError;
use crate::audio::SourceAudio;

/// Decode an in-memory byte stream into per-channel f32 samples.
pub fn decode_bytes(input: &[u8]) -> Result<SourceAudio, AudioError> {
    if input.is_empty() {
        return Err(AudioError::Decode("audio input is empty".to_string()));
    }

    let cursor = Cursor::new(input.to_vec());
    let mss = MediaSourceStream::new(Box::new(cursor), Default::default());

    let probed = symphonia::default::get_probe()
        .format(
            &Hint::new(),
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| AudioError::Decode(format!("unrecognized audio container: {e}")))?;

    let mut format = probed.format;
    let track = format
        .default_track()
        .ok_or_else(|| AudioError::Decode("no audio tracks found".to_string()))?;

    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| AudioError::Decode("track has no sample rate".to_string()))?;
    let channel_count = track.codec_params.channels.map(|c| c.count()).unwrap_or(1);
    if channel_count == 0 {
        return Err(AudioError::Decode("track has zero channels".to_string()));
    }

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| AudioError::Decode(format!("no decoder for codec: {e}")))?;

    let track_id = track.id;
    let mut interleaved: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(e) => return Err(AudioError::Decode(format!("failed to read packet: {e}"))),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            // Recoverable per-packet corruption: skip the packet, keep going
            Err(SymphoniaError::DecodeError(_)) => continue,
            Err(e) => return Err(AudioError::Decode(format!("failed to decode packet: {e}"))),
        };

        let spec = *decoded.spec();
        let capacity = decoded.capacity() as u64;
        let mut sample_buf = SampleBuffer::<f32>::new(capacity, spec);
        sample_buf.copy_interleaved_ref(decoded);
        interleaved.extend_from_slice(sample_buf.samples());
    }

    deinterleave(&interleaved, channel_count, sample_rate)
}

/// Split an interleaved sample stream into per-channel arrays.
fn deinterleave(
    interleaved: &[f32],
    channel_count: usize,
    sample_rate: u32,
) -> Result<SourceAudio, AudioError> {
    if interleaved.len() % channel_count != 0 {
        return Err(AudioError::Decode(format!(
            "decoded sample count {} is not divisible by {} channels",
            interleaved.len(),
            channel_count
        )));
    }

    let frames = interleaved.len() / channel_count;
    let mut channels: Vec<Vec<f32>> = vec![Vec::with_capacity(frames); channel_count];
    for frame in interleaved.chunks_exact(channel_count) {
        for (channel, &sample) in channels.iter_mut().zip(frame) {
            channel.push(sample);
        }
    }

    SourceAudio::new(sample_rate, channels).map_err(AudioError::Decode)
}
