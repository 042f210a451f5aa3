//! Audio mastering engine.
//!
//! Pure signal-chain transform from materialized segments to finished
//! encoded bytes: per-segment normalization, splice fades, EQ, dynamic
//! range compression, post filters, final normalization with limiting,
//! channel/rate conformance, and a tiered encoder fallback.

pub mod decode;
pub mod dsp;
pub mod duration;
pub mod encode;
pub mod mastering;
pub mod mix;
pub mod types;

pub use encode::{AudioFormat, EncodedAudio, EncoderTier};
pub use mastering::{MasterOutput, MasterReport, MasteringEngine};
pub use mix::MixConfig;
pub use types::{AudioSegment, Pcm};

/// Per-intent mastering constants. Not mutated at runtime; each intent
/// pipeline owns its own instance.
#[derive(Debug, Clone)]
pub struct MasteringConfig {
    /// RMS-proxy target for per-segment normalization, dBFS.
    pub target_segment_db: f32,
    /// Segments quieter than this are left untouched rather than boosted
    /// into audible noise.
    pub silence_floor_db: f32,
    /// Maximum per-segment boost, dB.
    pub max_boost_db: f32,
    /// True-peak ceiling for the final limiter, dBFS.
    pub peak_ceiling_db: f32,
    /// Output sample rate.
    pub sample_rate: u32,
    /// Output channel count (the chain always produces mono).
    pub channels: u16,
    /// Splice fade at segment joins, milliseconds.
    pub splice_fade_ms: u32,
    /// Anti-pop fade at the very start, milliseconds.
    pub lead_fade_ms: u32,
    /// High-pass corner frequency, Hz.
    pub highpass_hz: f32,
    /// Presence lift applied after the high-pass, dB.
    pub presence_lift_db: f32,
    /// Low-pass corner frequency for sibilance reduction, Hz.
    pub lowpass_hz: f32,
    /// Compressor threshold, dBFS.
    pub comp_threshold_db: f32,
    /// Compressor ratio (n:1).
    pub comp_ratio: f32,
    /// Compressor attack, milliseconds.
    pub comp_attack_ms: f32,
    /// Compressor release, milliseconds.
    pub comp_release_ms: f32,
    /// External transcoder VBR quality (2 = best, 9 = smallest).
    pub vbr_quality: u32,
    /// Subprocess timeout for the external transcoder, seconds.
    pub transcode_timeout_secs: u64,
    /// External transcoder binary name or path.
    pub transcoder_bin: String,
    /// Encoder tiers tried in order; exhaustion degrades to raw PCM.
    pub encoders: Vec<EncoderTier>,
}

impl Default for MasteringConfig {
    fn default() -> Self {
        MasteringConfig {
            target_segment_db: -20.0,
            silence_floor_db: -60.0,
            max_boost_db: 12.0,
            peak_ceiling_db: -1.0,
            sample_rate: 24_000,
            channels: 1,
            splice_fade_ms: 10,
            lead_fade_ms: 5,
            highpass_hz: 80.0,
            presence_lift_db: 1.0,
            lowpass_hz: 8_000.0,
            comp_threshold_db: -20.0,
            comp_ratio: 2.0,
            comp_attack_ms: 15.0,
            comp_release_ms: 100.0,
            vbr_quality: 5,
            transcode_timeout_secs: 30,
            transcoder_bin: "ffmpeg".to_string(),
            encoders: vec![EncoderTier::External, EncoderTier::WavContainer],
        }
    }
}

impl MasteringConfig {
    /// Dialogue mastering: full broadcast chain at 24 kHz mono.
    pub fn dialogue() -> Self {
        MasteringConfig::default()
    }

    /// Wellness mastering: smaller files, 22.05 kHz mono.
    pub fn wellness() -> Self {
        MasteringConfig {
            sample_rate: 22_050,
            ..MasteringConfig::default()
        }
    }
}
