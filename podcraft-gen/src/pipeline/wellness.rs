//! Wellness pipeline: structured script with timed pauses, speech spliced
//! over a looped ambient background, then tiered encode.

use crate::audio::encode;
use crate::audio::mix::{self, MixConfig, TimelineEntry};
use crate::audio::{decode, AudioSegment, MasteringConfig, Pcm};
use crate::clients::{ScriptModel, SpeechSynthesizer};
use crate::config::TtsConfig;
use crate::error::{Error, Result};
use crate::pipeline::runner::{synthesize_with_retry, AssembledAudio, IntentPipeline};
use crate::prompts;
use async_trait::async_trait;
use podcraft_common::{Intent, RequestMetadata, Script, Segment, StructuredScript};
use std::path::Path;
use tracing::{info, warn};

/// Guided sessions: calm speech over an ambient track with precise timeline
/// positioning and generous lead-in/lead-out.
pub struct WellnessPipeline {
    mastering_config: MasteringConfig,
    mix_config: MixConfig,
    background: Pcm,
    voice: String,
    default_voice: String,
}

impl WellnessPipeline {
    pub fn new(tts_config: &TtsConfig, background: Pcm) -> Self {
        Self::with_configs(
            tts_config,
            background,
            MasteringConfig::wellness(),
            MixConfig::default(),
        )
    }

    pub fn with_configs(
        tts_config: &TtsConfig,
        background: Pcm,
        mastering_config: MasteringConfig,
        mix_config: MixConfig,
    ) -> Self {
        WellnessPipeline {
            mastering_config,
            mix_config,
            background,
            voice: tts_config.default_voice.clone(),
            default_voice: tts_config.default_voice.clone(),
        }
    }

    /// Load and conform the ambient track from disk. Called once at startup;
    /// the decoded buffer is shared read-only afterwards.
    pub fn load_background(path: &Path, sample_rate: u32) -> Result<Pcm> {
        let bytes = std::fs::read(path)?;
        let pcm = decode::decode_conformant(&bytes, sample_rate)?;
        info!(
            path = %path.display(),
            seconds = pcm.duration_sec() as u64,
            "ambient background loaded"
        );
        Ok(pcm)
    }

    fn fallback_script(&self, metadata: &RequestMetadata) -> StructuredScript {
        StructuredScript {
            metadata: Some(podcraft_common::ScriptMetadata {
                title: Some(metadata.title()),
                description: Some(metadata.summary()),
            }),
            themes: vec![(
                "session".to_string(),
                vec![
                    Segment {
                        speaker: None,
                        text: "Take a slow, deep breath in.".to_string(),
                        category: Some("breathing".to_string()),
                        pause_after_sec: 6,
                    },
                    Segment {
                        speaker: None,
                        text: "And breathe out, gently.".to_string(),
                        category: Some("breathing".to_string()),
                        pause_after_sec: 6,
                    },
                    Segment {
                        speaker: None,
                        text: "Let your shoulders soften as you settle in.".to_string(),
                        category: Some("relaxation".to_string()),
                        pause_after_sec: 10,
                    },
                ],
            )],
        }
    }

    /// Pull the model-generated title/description into the request metadata
    /// so the persisted episode reflects the generated content.
    fn adopt_script_metadata(script: &StructuredScript, metadata: &mut RequestMetadata) {
        if let Some(title) = script.title() {
            metadata.episode_title = Some(title.to_string());
        }
        if let Some(description) = script.description() {
            metadata.episode_summary = Some(description.to_string());
        }
    }
}

#[async_trait]
impl IntentPipeline for WellnessPipeline {
    fn intent(&self) -> Intent {
        Intent::Wellness
    }

    fn sample_rate(&self) -> u32 {
        self.mastering_config.sample_rate
    }

    async fn produce_script(
        &self,
        model: &dyn ScriptModel,
        message: &str,
        lang: &str,
        duration_sec: u32,
        metadata: &mut RequestMetadata,
    ) -> Result<Script> {
        let system = prompts::wellness_system_prompt(duration_sec, lang);
        let context =
            prompts::user_context(message, &metadata.title(), &metadata.summary(), duration_sec);

        let raw = model.complete_script(&system, &context).await?;
        let script = match StructuredScript::parse(&raw) {
            Ok(script) => {
                info!(
                    themes = script.themes.len(),
                    segments = script.segment_count(),
                    "wellness script parsed"
                );
                script
            }
            Err(e) => {
                warn!("wellness script unparseable ({e}), using fallback session");
                self.fallback_script(metadata)
            }
        };

        Self::adopt_script_metadata(&script, metadata);
        Ok(Script::Structured(script))
    }

    async fn produce_segments(
        &self,
        tts: &dyn SpeechSynthesizer,
        script: &Script,
    ) -> Result<Vec<AudioSegment>> {
        let script = match script {
            Script::Structured(s) => s,
            Script::Flat(_) => {
                return Err(Error::InvalidScript(
                    "wellness expects a structured script".to_string(),
                ))
            }
        };

        let mut segments = Vec::new();
        for (theme, theme_segments) in &script.themes {
            info!(theme = %theme, count = theme_segments.len(), "synthesizing theme");
            for segment in theme_segments {
                if segment.is_empty() {
                    continue;
                }
                if !segment.text.trim().is_empty() {
                    match synthesize_with_retry(
                        tts,
                        &segment.text,
                        &self.voice,
                        &self.default_voice,
                        Some(prompts::WELLNESS_STYLE_HINT),
                    )
                    .await
                    {
                        Ok(bytes) => segments.push(AudioSegment::speech(bytes)),
                        Err(e) => warn!(
                            category = segment.category.as_deref().unwrap_or("unknown"),
                            "dropping segment after retry: {e}"
                        ),
                    }
                }
                if segment.pause_after_sec > 0 {
                    segments.push(AudioSegment::silence(segment.pause_after_sec));
                }
            }
        }
        Ok(segments)
    }

    async fn assemble(&self, segments: Vec<AudioSegment>) -> Result<AssembledAudio> {
        let rate = self.mastering_config.sample_rate;

        let mut timeline = Vec::with_capacity(segments.len());
        let mut decoded = 0usize;
        let mut dropped = 0usize;
        for segment in &segments {
            match segment {
                AudioSegment::Speech { bytes } => match decode::decode_conformant(bytes, rate) {
                    Ok(pcm) => {
                        decoded += 1;
                        timeline.push(TimelineEntry::Speech(pcm));
                    }
                    Err(e) => {
                        warn!("dropping undecodable wellness segment: {e}");
                        dropped += 1;
                    }
                },
                AudioSegment::Silence { seconds } => {
                    timeline.push(TimelineEntry::Pause(*seconds));
                }
            }
        }
        if decoded == 0 {
            return Err(Error::NoValidSegments);
        }

        let mixed = mix::mix_with_background(&timeline, &self.background, &self.mix_config);
        let encoded = encode::encode(&mixed, &self.mastering_config).await;

        Ok(AssembledAudio {
            bytes: encoded.bytes,
            format: encoded.format,
            degraded: dropped > 0,
        })
    }
}
