//! Audio value types.

/// A materialized segment handed from the pipeline to the mastering engine:
/// either encoded speech bytes or a timed block of silence. Created by the
/// pipeline, consumed exactly once during assembly.
#[derive(Debug, Clone)]
pub enum AudioSegment {
    Speech { bytes: Vec<u8> },
    Silence { seconds: u32 },
}

impl AudioSegment {
    pub fn speech(bytes: Vec<u8>) -> Self {
        AudioSegment::Speech { bytes }
    }

    pub fn silence(seconds: u32) -> Self {
        AudioSegment::Silence { seconds }
    }

    pub fn is_speech(&self) -> bool {
        matches!(self, AudioSegment::Speech { .. })
    }

    /// Encoded payload, if any (silence carries none).
    pub fn payload(&self) -> Option<&[u8]> {
        match self {
            AudioSegment::Speech { bytes } => Some(bytes),
            AudioSegment::Silence { .. } => None,
        }
    }
}

/// Mono PCM buffer: f32 samples in [-1, 1] at a known sample rate.
#[derive(Debug, Clone, PartialEq)]
pub struct Pcm {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl Pcm {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Pcm { samples, sample_rate }
    }

    /// A silent buffer of the given duration.
    pub fn silence(seconds: u32, sample_rate: u32) -> Self {
        Pcm {
            samples: vec![0.0; seconds as usize * sample_rate as usize],
            sample_rate,
        }
    }

    pub fn duration_sec(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Convert f32 samples to interleaved little-endian 16-bit PCM bytes,
/// the wire format both the external transcoder and the raw fallback use.
pub fn to_s16le_bytes(samples: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(samples.len() * 2);
    for &s in samples {
        let v = (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        out.extend_from_slice(&v.to_le_bytes());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_has_expected_length() {
        let pcm = Pcm::silence(3, 1000);
        assert_eq!(pcm.samples.len(), 3000);
        assert!(pcm.samples.iter().all(|&s| s == 0.0));
        assert_eq!(pcm.duration_sec(), 3.0);
    }

    #[test]
    fn segment_payload() {
        let speech = AudioSegment::speech(vec![1, 2, 3]);
        assert!(speech.is_speech());
        assert_eq!(speech.payload(), Some(&[1u8, 2, 3][..]));

        let silence = AudioSegment::silence(5);
        assert!(!silence.is_speech());
        assert_eq!(silence.payload(), None);
    }

    #[test]
    fn s16le_conversion_clamps_and_scales() {
        let bytes = to_s16le_bytes(&[0.0, 1.0, -1.0, 2.0]);
        assert_eq!(bytes.len(), 8);
        assert_eq!(i16::from_le_bytes([bytes[0], bytes[1]]), 0);
        assert_eq!(i16::from_le_bytes([bytes[2], bytes[3]]), i16::MAX);
        assert_eq!(i16::from_le_bytes([bytes[4], bytes[5]]), -i16::MAX);
        // Out-of-range input clamps instead of wrapping
        assert_eq!(i16::from_le_bytes([bytes[6], bytes[7]]), i16::MAX);
    }
}
