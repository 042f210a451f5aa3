//! Audio decoding using symphonia.
//!
//! Decodes encoded segment bytes (MP3, WAV, AAC, Vorbis) into mono f32 PCM
//! and conforms sample rates with rubato. Sources are in-memory byte
//! buffers, never files.

use crate::audio::types::Pcm;
use crate::error::{Error, Result};
use rubato::{FastFixedIn, Resampler};
use std::io::Cursor;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::debug;

/// Decode encoded audio bytes to mono f32 PCM at the source sample rate.
///
/// Multi-channel input is downmixed by averaging. Corrupt trailing packets
/// are tolerated; a stream that yields no frames at all is an error.
pub fn decode_bytes(bytes: &[u8]) -> Result<Pcm> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes.to_vec())), Default::default());

    let probed = symphonia::default::get_probe()
        .format(
            &Hint::new(),
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| Error::Decode(format!("unrecognized audio container: {e}")))?;

    let mut format = probed.format;
    let track = format
        .default_track()
        .ok_or_else(|| Error::Decode("no audio track found".to_string()))?;
    let track_id = track.id;
    let codec_params = track.codec_params.clone();

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| Error::Decode(format!("unsupported codec: {e}")))?;

    let mut sample_rate = codec_params.sample_rate.unwrap_or(0);
    let mut samples: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => {
                debug!("stopping decode on packet error: {e}");
                break;
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            // Tolerate corrupt packets mid-stream
            Err(SymphoniaError::DecodeError(e)) => {
                debug!("skipping undecodable packet: {e}");
                continue;
            }
            Err(e) => {
                debug!("stopping decode on error: {e}");
                break;
            }
        };

        let spec = *decoded.spec();
        if sample_rate == 0 {
            sample_rate = spec.rate;
        }
        let channels = spec.channels.count();

        // Sized per packet; frame counts vary between packets
        let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        buf.copy_interleaved_ref(decoded);

        // Downmix interleaved frames to mono by averaging
        let interleaved = buf.samples();
        if channels <= 1 {
            samples.extend_from_slice(interleaved);
        } else {
            for frame in interleaved.chunks_exact(channels) {
                samples.push(frame.iter().sum::<f32>() / channels as f32);
            }
        }
    }

    if samples.is_empty() || sample_rate == 0 {
        return Err(Error::Decode("stream yielded no audio frames".to_string()));
    }

    debug!(
        frames = samples.len(),
        sample_rate, "decoded segment to mono PCM"
    );
    Ok(Pcm::new(samples, sample_rate))
}

/// Resample mono PCM to `target_rate`. Already-conformant input is returned
/// as-is.
pub fn resample(pcm: Pcm, target_rate: u32) -> Result<Pcm> {
    if pcm.sample_rate == target_rate || pcm.is_empty() {
        return Ok(Pcm::new(pcm.samples, target_rate));
    }

    let input_frames = pcm.samples.len();
    let mut resampler = FastFixedIn::<f32>::new(
        target_rate as f64 / pcm.sample_rate as f64,
        1.0,
        rubato::PolynomialDegree::Septic,
        input_frames,
        1,
    )
    .map_err(|e| Error::Decode(format!("failed to create resampler: {e}")))?;

    let output = resampler
        .process(&[pcm.samples], None)
        .map_err(|e| Error::Decode(format!("resampling failed: {e}")))?;

    debug!(
        from = pcm.sample_rate,
        to = target_rate,
        in_frames = input_frames,
        out_frames = output[0].len(),
        "resampled segment"
    );
    Ok(Pcm::new(output.into_iter().next().unwrap_or_default(), target_rate))
}

/// Decode and conform a segment to the engine's working rate in one step.
pub fn decode_conformant(bytes: &[u8], target_rate: u32) -> Result<Pcm> {
    let pcm = decode_bytes(bytes)?;
    resample(pcm, target_rate)
}
