//! Tiered audio encoding.
//!
//! Tiers are tried in the configured order: an external command-line
//! transcoder run as a bounded subprocess, then an in-process WAV container
//! writer. Exhaustion is not a failure: the conformant PCM bytes are
//! returned unchanged rather than losing the episode.

use crate::audio::types::{to_s16le_bytes, Pcm};
use crate::audio::MasteringConfig;
use std::io::Cursor;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// One encoder backend in the preference order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncoderTier {
    /// External command-line transcoder (subprocess, bounded timeout).
    External,
    /// In-process WAV container via hound.
    WavContainer,
}

/// Container format of the final artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Mp3,
    Wav,
    /// Raw little-endian 16-bit PCM; the identity fallback.
    RawPcm,
}

impl AudioFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "audio/mpeg",
            AudioFormat::Wav => "audio/wav",
            AudioFormat::RawPcm => "application/octet-stream",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Wav => "wav",
            AudioFormat::RawPcm => "pcm",
        }
    }
}

/// Final encoded artifact.
#[derive(Debug, Clone)]
pub struct EncodedAudio {
    pub bytes: Vec<u8>,
    pub format: AudioFormat,
}

/// Encode conformant PCM through the configured tiers. Never fails: when
/// every tier is unavailable the raw PCM bytes are returned as-is.
pub async fn encode(pcm: &Pcm, config: &MasteringConfig) -> EncodedAudio {
    let raw = to_s16le_bytes(&pcm.samples);

    for tier in &config.encoders {
        match tier {
            EncoderTier::External => {
                if let Some(bytes) = encode_external(raw.clone(), pcm.sample_rate, config).await {
                    info!(
                        pcm_bytes = raw.len(),
                        mp3_bytes = bytes.len(),
                        "external transcoder produced compressed audio"
                    );
                    return EncodedAudio {
                        bytes,
                        format: AudioFormat::Mp3,
                    };
                }
            }
            EncoderTier::WavContainer => {
                if let Some(bytes) = encode_wav(pcm) {
                    info!(bytes = bytes.len(), "encoded WAV container");
                    return EncodedAudio {
                        bytes,
                        format: AudioFormat::Wav,
                    };
                }
            }
        }
    }

    warn!("no encoder available, returning uncompressed PCM");
    EncodedAudio {
        bytes: raw,
        format: AudioFormat::RawPcm,
    }
}

/// Run the external transcoder: s16le PCM on stdin, MP3 on stdout.
///
/// Non-zero exit, empty output, spawn failure, or timeout all mean
/// "unavailable". The child is spawned with kill-on-drop, so the timeout
/// path (and an aborted parent request) cannot leak an orphan process.
async fn encode_external(
    pcm_bytes: Vec<u8>,
    sample_rate: u32,
    config: &MasteringConfig,
) -> Option<Vec<u8>> {
    let rate = sample_rate.to_string();
    let channels = config.channels.to_string();
    let quality = config.vbr_quality.to_string();

    let mut command = Command::new(&config.transcoder_bin);
    command
        .args([
            "-hide_banner",
            "-loglevel",
            "error",
            "-f",
            "s16le",
            "-ar",
            &rate,
            "-ac",
            &channels,
            "-i",
            "pipe:0",
            "-vn",
            "-ac",
            &channels,
            "-ar",
            &rate,
            "-q:a",
            &quality,
            "-f",
            "mp3",
            "pipe:1",
        ])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true);

    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(e) => {
            warn!("external transcoder unavailable: {e}");
            return None;
        }
    };

    let mut stdin = child.stdin.take()?;
    let writer = tokio::spawn(async move {
        // A broken pipe here just means the child exited early
        let _ = stdin.write_all(&pcm_bytes).await;
        let _ = stdin.shutdown().await;
    });

    let wait = tokio::time::timeout(
        Duration::from_secs(config.transcode_timeout_secs),
        child.wait_with_output(),
    )
    .await;

    match wait {
        Ok(Ok(output)) if output.status.success() && !output.stdout.is_empty() => {
            let _ = writer.await;
            Some(output.stdout)
        }
        Ok(Ok(output)) => {
            warn!(status = ?output.status, "external transcoder failed");
            writer.abort();
            None
        }
        Ok(Err(e)) => {
            warn!("external transcoder I/O error: {e}");
            writer.abort();
            None
        }
        Err(_) => {
            // Dropping the in-flight future drops the child, which is
            // killed via kill_on_drop
            warn!(
                timeout_secs = config.transcode_timeout_secs,
                "external transcoder timed out"
            );
            writer.abort();
            None
        }
    }
}

/// Wrap PCM in a 16-bit WAV container.
fn encode_wav(pcm: &Pcm) -> Option<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: pcm.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = match hound::WavWriter::new(&mut cursor, spec) {
            Ok(writer) => writer,
            Err(e) => {
                warn!("WAV writer unavailable: {e}");
                return None;
            }
        };
        for &s in &pcm.samples {
            let v = (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
            if writer.write_sample(v).is_err() {
                return None;
            }
        }
        if writer.finalize().is_err() {
            return None;
        }
    }

    debug!(frames = pcm.samples.len(), "wrapped PCM in WAV container");
    Some(cursor.into_inner())
}
