//! PCM audio constants and the silence classifier
//!
//! All call audio is raw signed 16-bit little-endian mono PCM at 8 kHz.

use std::time::Duration;

/// Telephony sample rate
pub const SAMPLE_RATE_HZ: u32 = 8000;

/// Bytes per 16-bit sample
pub const BYTES_PER_SAMPLE: usize = 2;

/// Outbound playback chunk (200 ms at 8 kHz mono)
pub const PLAYBACK_CHUNK_BYTES: usize = 3200;

/// Mean absolute amplitude below which a chunk counts as silence
pub const SILENCE_AMPLITUDE_THRESHOLD: i64 = 200;

/// Integer mean of absolute sample values.
///
/// Returns `None` for buffers holding no complete sample. A trailing odd
/// byte is ignored.
pub fn mean_amplitude(pcm: &[u8]) -> Option<i64> {
    let count = pcm.len() / BYTES_PER_SAMPLE;
    if count == 0 {
        return None;
    }

    let sum: i64 = pcm
        .chunks_exact(BYTES_PER_SAMPLE)
        .map(|pair| i64::from(i16::from_le_bytes([pair[0], pair[1]])).abs())
        .sum();

    Some(sum / count as i64)
}

/// Classify a PCM buffer as silence.
///
/// Buffers shorter than one sample are always silent.
pub fn is_silence(pcm: &[u8]) -> bool {
    match mean_amplitude(pcm) {
        Some(avg) => avg < SILENCE_AMPLITUDE_THRESHOLD,
        None => true,
    }
}

/// Playback duration of `bytes` of call audio.
pub fn chunk_duration(bytes: usize) -> Duration {
    let samples = (bytes / BYTES_PER_SAMPLE) as u64;
    Duration::from_millis(samples * 1000 / u64::from(SAMPLE_RATE_HZ))
}
