//! Episode duration measurement.
//!
//! The persisted duration always comes from the final encoded bytes, never
//! from pre-encode estimates. When the bytes cannot be parsed as audio
//! (e.g. the raw-PCM degraded artifact), one consistent estimate is used:
//! `bytes / (sample_rate × 2)`, i.e. 16-bit mono PCM at the engine's
//! configured rate, floored at one second.

use crate::audio::decode;
use std::io::Cursor;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

/// Probe encoded bytes for their real duration in seconds.
pub fn probe_duration_sec(bytes: &[u8]) -> Option<f64> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes.to_vec())), Default::default());
    let probed = symphonia::default::get_probe()
        .format(
            &Hint::new(),
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .ok()?;

    let track = probed.format.default_track()?;
    let params = &track.codec_params;

    if let (Some(n_frames), Some(rate)) = (params.n_frames, params.sample_rate) {
        let secs = n_frames as f64 / rate as f64;
        debug!(secs, "duration from container header");
        return Some(secs);
    }

    // Frame count not declared (common for MP3): decode and count
    let pcm = decode::decode_bytes(bytes).ok()?;
    let secs = pcm.duration_sec();
    debug!(secs, "duration from full decode");
    Some(secs)
}

/// Byte-length estimate assuming 16-bit mono PCM at `sample_rate`.
pub fn estimate_duration_sec(byte_len: usize, sample_rate: u32) -> i64 {
    let bytes_per_sec = sample_rate as usize * 2;
    ((byte_len / bytes_per_sec.max(1)) as i64).max(1)
}

/// Real duration of the final artifact, with the estimate as last resort.
pub fn episode_duration_sec(bytes: &[u8], sample_rate: u32) -> i64 {
    match probe_duration_sec(bytes) {
        Some(secs) => (secs.round() as i64).max(1),
        None => {
            let estimated = estimate_duration_sec(bytes.len(), sample_rate);
            warn!(estimated, "duration probe failed, using byte estimate");
            estimated
        }
    }
}
