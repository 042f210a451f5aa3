//! Background mixing for wellness sessions.
//!
//! Speech segments are spliced onto a looped ambient track at precise
//! timeline positions: a fixed lead-in, then each segment at its running
//! cursor, pauses advancing the cursor while the background keeps playing,
//! and a fixed lead-out after the last segment.

use crate::audio::types::Pcm;
use tracing::{debug, info};

/// Timeline mixing constants. Owned per pipeline, never mutated.
#[derive(Debug, Clone)]
pub struct MixConfig {
    /// Background attenuation under speech.
    pub background_volume: f32,
    /// Speech boost over the background.
    pub speech_volume: f32,
    /// Seconds of bare background before the first segment.
    pub lead_in_sec: u32,
    /// Seconds of bare background after the last segment.
    pub lead_out_sec: u32,
}

impl Default for MixConfig {
    fn default() -> Self {
        MixConfig {
            background_volume: 0.95,
            speech_volume: 1.2,
            lead_in_sec: 60,
            lead_out_sec: 60,
        }
    }
}

/// One entry of the wellness timeline, in script order.
#[derive(Debug, Clone)]
pub enum TimelineEntry {
    /// Speech PCM, already conformed to the background's sample rate.
    Speech(Pcm),
    /// Seconds of silence over the continuing background.
    Pause(u32),
}

/// Splice speech onto the looped background track.
///
/// The background is looped (never stretched) to cover
/// lead-in + content + lead-out. Under speech, samples mix additively as
/// `background × background_volume + speech × speech_volume`, clamped to
/// the valid range; outside speech the background plays untouched.
pub fn mix_with_background(timeline: &[TimelineEntry], background: &Pcm, config: &MixConfig) -> Pcm {
    let rate = background.sample_rate as usize;

    let content_samples: usize = timeline
        .iter()
        .map(|entry| match entry {
            TimelineEntry::Speech(pcm) => pcm.samples.len(),
            TimelineEntry::Pause(secs) => *secs as usize * rate,
        })
        .sum();

    let total_samples =
        (config.lead_in_sec as usize + config.lead_out_sec as usize) * rate + content_samples;

    info!(
        total_sec = total_samples / rate.max(1),
        content_sec = content_samples / rate.max(1),
        "mixing timeline onto background"
    );

    // Loop the background to the full length
    let mut out: Vec<f32> = Vec::with_capacity(total_samples);
    if background.samples.is_empty() {
        out.resize(total_samples, 0.0);
    } else {
        while out.len() < total_samples {
            let remaining = total_samples - out.len();
            let take = remaining.min(background.samples.len());
            out.extend_from_slice(&background.samples[..take]);
        }
    }

    // Splice speech at the running cursor
    let mut cursor = config.lead_in_sec as usize * rate;
    for entry in timeline {
        match entry {
            TimelineEntry::Speech(pcm) => {
                for (i, &s) in pcm.samples.iter().enumerate() {
                    let idx = cursor + i;
                    if idx >= out.len() {
                        break;
                    }
                    out[idx] = (out[idx] * config.background_volume
                        + s * config.speech_volume)
                        .clamp(-1.0, 1.0);
                }
                cursor += pcm.samples.len();
                debug!(at_sec = cursor / rate.max(1), "speech spliced");
            }
            TimelineEntry::Pause(secs) => {
                cursor += *secs as usize * rate;
                debug!(pause_sec = secs, at_sec = cursor / rate.max(1), "pause");
            }
        }
    }

    Pcm::new(out, background.sample_rate)
}
