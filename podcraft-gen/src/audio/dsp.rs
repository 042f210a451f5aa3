//! Signal-processing primitives for the mastering chain.
//!
//! Everything operates on mono f32 buffers in [-1, 1]. Gain math happens in
//! dB; levels come from an RMS proxy rather than true loudness measurement.

use crate::error::{Error, Result};

/// Lower bound used in place of -inf for silent buffers.
pub const SILENCE_DB: f32 = -120.0;

/// Convert decibels to linear amplitude.
pub fn db_to_amp(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// Convert linear amplitude to decibels, floored at [`SILENCE_DB`].
pub fn amp_to_db(amp: f32) -> f32 {
    if amp <= 0.0 {
        SILENCE_DB
    } else {
        (20.0 * amp.log10()).max(SILENCE_DB)
    }
}

/// RMS level of a buffer in dBFS.
pub fn rms_db(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return SILENCE_DB;
    }
    let sum_sq: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    let rms = (sum_sq / samples.len() as f64).sqrt() as f32;
    amp_to_db(rms)
}

/// Peak level of a buffer in dBFS.
pub fn peak_db(samples: &[f32]) -> f32 {
    let peak = samples.iter().fold(0.0_f32, |acc, &s| acc.max(s.abs()));
    amp_to_db(peak)
}

/// Apply a flat gain in dB.
pub fn apply_gain_db(samples: &mut [f32], gain_db: f32) {
    let amp = db_to_amp(gain_db);
    for s in samples.iter_mut() {
        *s *= amp;
    }
}

/// Per-segment normalization toward `target_db`.
///
/// Segments at or below `floor_db` are left untouched (boosting near-silence
/// only amplifies artifacts), and the boost never exceeds `max_boost_db`.
/// Returns the gain that was applied.
pub fn normalize_segment(
    samples: &mut [f32],
    target_db: f32,
    floor_db: f32,
    max_boost_db: f32,
) -> f32 {
    let level = rms_db(samples);
    if level <= floor_db {
        return 0.0;
    }
    let gain = (target_db - level).min(max_boost_db);
    apply_gain_db(samples, gain);
    gain
}

/// Normalize so the peak sits at `target_db`. Idempotent: a second pass
/// computes zero gain.
pub fn normalize_peak(samples: &mut [f32], target_db: f32) {
    let peak = peak_db(samples);
    if peak <= SILENCE_DB {
        return;
    }
    apply_gain_db(samples, target_db - peak);
}

/// Final limiter: reduce gain only if the peak exceeds `ceiling_db`.
pub fn limit_peak(samples: &mut [f32], ceiling_db: f32) {
    let peak = peak_db(samples);
    if peak > ceiling_db {
        apply_gain_db(samples, ceiling_db - peak);
    }
}

/// Linear fade-in over the first `n` samples.
pub fn fade_in(samples: &mut [f32], n: usize) {
    let n = n.min(samples.len());
    if n == 0 {
        return;
    }
    for i in 0..n {
        samples[i] *= i as f32 / n as f32;
    }
}

/// Linear fade-out over the last `n` samples.
pub fn fade_out(samples: &mut [f32], n: usize) {
    let len = samples.len();
    let n = n.min(len);
    if n == 0 {
        return;
    }
    for i in 0..n {
        samples[len - n + i] *= (n - i) as f32 / n as f32;
    }
}

/// Samples covered by `ms` milliseconds at `sample_rate`.
pub fn ms_to_samples(ms: u32, sample_rate: u32) -> usize {
    (ms as u64 * sample_rate as u64 / 1000) as usize
}

/// Second-order IIR filter (RBJ cookbook coefficients, Q = 0.7071).
pub struct Biquad {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
    z1: f32,
    z2: f32,
}

impl Biquad {
    const Q: f32 = std::f32::consts::FRAC_1_SQRT_2;

    fn from_coeffs(b0: f32, b1: f32, b2: f32, a0: f32, a1: f32, a2: f32) -> Self {
        Biquad {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
            z1: 0.0,
            z2: 0.0,
        }
    }

    /// High-pass filter at `freq` Hz.
    pub fn high_pass(sample_rate: u32, freq: f32) -> Result<Self> {
        Self::check_corner(sample_rate, freq)?;
        let w0 = 2.0 * std::f32::consts::PI * freq / sample_rate as f32;
        let (sin_w0, cos_w0) = w0.sin_cos();
        let alpha = sin_w0 / (2.0 * Self::Q);

        Ok(Self::from_coeffs(
            (1.0 + cos_w0) / 2.0,
            -(1.0 + cos_w0),
            (1.0 + cos_w0) / 2.0,
            1.0 + alpha,
            -2.0 * cos_w0,
            1.0 - alpha,
        ))
    }

    /// Low-pass filter at `freq` Hz.
    pub fn low_pass(sample_rate: u32, freq: f32) -> Result<Self> {
        Self::check_corner(sample_rate, freq)?;
        let w0 = 2.0 * std::f32::consts::PI * freq / sample_rate as f32;
        let (sin_w0, cos_w0) = w0.sin_cos();
        let alpha = sin_w0 / (2.0 * Self::Q);

        Ok(Self::from_coeffs(
            (1.0 - cos_w0) / 2.0,
            1.0 - cos_w0,
            (1.0 - cos_w0) / 2.0,
            1.0 + alpha,
            -2.0 * cos_w0,
            1.0 - alpha,
        ))
    }

    fn check_corner(sample_rate: u32, freq: f32) -> Result<()> {
        if !(0.0..sample_rate as f32 / 2.0).contains(&freq) || freq <= 0.0 {
            return Err(Error::Decode(format!(
                "filter corner {freq} Hz invalid for sample rate {sample_rate}"
            )));
        }
        Ok(())
    }

    /// Process a buffer in place (direct form II transposed).
    pub fn process(&mut self, samples: &mut [f32]) {
        for s in samples.iter_mut() {
            let x = *s;
            let y = self.b0 * x + self.z1;
            self.z1 = self.b1 * x - self.a1 * y + self.z2;
            self.z2 = self.b2 * x - self.a2 * y;
            *s = y;
        }
    }
}

/// Feed-forward dynamic range compressor with an attack/release envelope
/// follower. Construction validates the configuration so an unsupported
/// setup degrades to a no-op upstream instead of corrupting audio.
pub struct Compressor {
    threshold_db: f32,
    slope: f32,
    attack_coeff: f32,
    release_coeff: f32,
    envelope: f32,
}

impl Compressor {
    pub fn new(
        threshold_db: f32,
        ratio: f32,
        attack_ms: f32,
        release_ms: f32,
        sample_rate: u32,
    ) -> Result<Self> {
        if ratio < 1.0 || attack_ms <= 0.0 || release_ms <= 0.0 || threshold_db >= 0.0 {
            return Err(Error::Decode(format!(
                "unsupported compressor configuration: threshold {threshold_db} dB, ratio {ratio}:1, attack {attack_ms} ms, release {release_ms} ms"
            )));
        }

        let coeff = |ms: f32| (-1.0 / (sample_rate as f32 * ms / 1000.0)).exp();
        Ok(Compressor {
            threshold_db,
            slope: 1.0 - 1.0 / ratio,
            attack_coeff: coeff(attack_ms),
            release_coeff: coeff(release_ms),
            envelope: 0.0,
        })
    }

    /// Compress a buffer in place.
    pub fn process(&mut self, samples: &mut [f32]) {
        for s in samples.iter_mut() {
            let level = s.abs();
            let coeff = if level > self.envelope {
                self.attack_coeff
            } else {
                self.release_coeff
            };
            self.envelope = coeff * self.envelope + (1.0 - coeff) * level;

            let env_db = amp_to_db(self.envelope);
            if env_db > self.threshold_db {
                let reduction_db = (self.threshold_db - env_db) * self.slope;
                *s *= db_to_amp(reduction_db);
            }
        }
    }
}
