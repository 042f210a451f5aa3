//! The mastering chain.
//!
//! Fixed stage order: per-segment normalization, concatenation with splice
//! fades, EQ, dynamic range compression, post filters, final normalization
//! with limiting, channel/rate conformance, tiered encode. Optional stages
//! degrade to no-ops rather than aborting; only a fully undecodable input
//! set is fatal.

use crate::audio::decode;
use crate::audio::dsp::{self, Biquad, Compressor};
use crate::audio::encode::{self, EncodedAudio};
use crate::audio::types::{AudioSegment, Pcm};
use crate::audio::MasteringConfig;
use crate::error::{Error, Result};
use tracing::{debug, info, warn};

/// What actually happened during a mastering run: how many segments made it
/// in, and which optional stages were skipped. Degradation is data, not an
/// error.
#[derive(Debug, Clone, Default)]
pub struct MasterReport {
    pub segments_used: usize,
    pub segments_dropped: usize,
    pub skipped_stages: Vec<&'static str>,
}

impl MasterReport {
    pub fn is_degraded(&self) -> bool {
        self.segments_dropped > 0 || !self.skipped_stages.is_empty()
    }
}

/// Final artifact plus the run report.
#[derive(Debug, Clone)]
pub struct MasterOutput {
    pub audio: EncodedAudio,
    pub report: MasterReport,
}

/// Signal-chain transform from materialized segments to encoded bytes.
pub struct MasteringEngine {
    config: MasteringConfig,
}

impl MasteringEngine {
    pub fn new(config: MasteringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MasteringConfig {
        &self.config
    }

    /// Run the full chain over an ordered segment list.
    ///
    /// Fails with [`Error::NoValidSegments`] only when no speech segment
    /// decodes; the caller owns the raw-concatenation fallback for that
    /// case.
    pub async fn master(&self, segments: &[AudioSegment]) -> Result<MasterOutput> {
        let rate = self.config.sample_rate;
        let mut report = MasterReport::default();

        // 1. Decode and normalize each segment
        let mut prepared: Vec<Pcm> = Vec::with_capacity(segments.len());
        let mut speech_used = 0usize;
        for (i, segment) in segments.iter().enumerate() {
            match segment {
                AudioSegment::Speech { bytes } => match decode::decode_conformant(bytes, rate) {
                    Ok(mut pcm) => {
                        let gain = dsp::normalize_segment(
                            &mut pcm.samples,
                            self.config.target_segment_db,
                            self.config.silence_floor_db,
                            self.config.max_boost_db,
                        );
                        debug!(segment = i, gain_db = gain, "segment normalized");
                        speech_used += 1;
                        prepared.push(pcm);
                    }
                    Err(e) => {
                        warn!(segment = i, "dropping undecodable segment: {e}");
                        report.segments_dropped += 1;
                    }
                },
                AudioSegment::Silence { seconds } => {
                    prepared.push(Pcm::silence(*seconds, rate));
                }
            }
        }

        if speech_used == 0 {
            return Err(Error::NoValidSegments);
        }
        report.segments_used = speech_used;
        info!(used = speech_used, dropped = report.segments_dropped, "mastering segments");

        // 2. Concatenate with splice fades
        let fade = dsp::ms_to_samples(self.config.splice_fade_ms, rate);
        let mut master = concat_with_fades(prepared, fade);

        // 3. Equalization: high-pass plus presence lift
        match Biquad::high_pass(rate, self.config.highpass_hz) {
            Ok(mut filter) => {
                filter.process(&mut master);
                dsp::apply_gain_db(&mut master, self.config.presence_lift_db);
            }
            Err(e) => {
                warn!("skipping equalization: {e}");
                report.skipped_stages.push("equalization");
            }
        }

        // 4. Dynamic range compression
        match Compressor::new(
            self.config.comp_threshold_db,
            self.config.comp_ratio,
            self.config.comp_attack_ms,
            self.config.comp_release_ms,
            rate,
        ) {
            Ok(mut compressor) => compressor.process(&mut master),
            Err(e) => {
                warn!("skipping compression: {e}");
                report.skipped_stages.push("compression");
            }
        }

        // 5. Post filters: sibilance low-pass and anti-pop lead fade
        match Biquad::low_pass(rate, self.config.lowpass_hz) {
            Ok(mut filter) => filter.process(&mut master),
            Err(e) => {
                warn!("skipping low-pass filter: {e}");
                report.skipped_stages.push("low_pass");
            }
        }
        dsp::fade_in(&mut master, dsp::ms_to_samples(self.config.lead_fade_ms, rate));

        // 6. Final normalization and limiting
        dsp::normalize_peak(&mut master, self.config.peak_ceiling_db);
        dsp::limit_peak(&mut master, self.config.peak_ceiling_db);

        // 7/8. The chain is already mono at the working rate; encode
        let pcm = Pcm::new(master, rate);
        let audio = encode::encode(&pcm, &self.config).await;

        info!(
            bytes = audio.bytes.len(),
            format = ?audio.format,
            degraded = report.is_degraded(),
            "mastering complete"
        );
        Ok(MasterOutput { audio, report })
    }
}

/// Join segments end to end with a short fade-out on each trailing edge and
/// fade-in on the next leading edge, preventing splice clicks.
fn concat_with_fades(segments: Vec<Pcm>, fade_samples: usize) -> Vec<f32> {
    let total: usize = segments.iter().map(|p| p.samples.len()).sum();
    let mut out: Vec<f32> = Vec::with_capacity(total);

    let count = segments.len();
    for (i, mut pcm) in segments.into_iter().enumerate() {
        if i > 0 {
            dsp::fade_in(&mut pcm.samples, fade_samples);
        }
        if i + 1 < count {
            dsp::fade_out(&mut pcm.samples, fade_samples);
        }
        out.extend_from_slice(&pcm.samples);
    }
    out
}
