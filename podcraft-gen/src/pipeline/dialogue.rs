//! Dialogue pipeline: two-host conversation with the full mastering chain.
//!
//! The speaker-to-voice mapping is deliberately inverted relative to the
//! script's own labels (`speaker_1` is synthesized with the voice
//! configured for speaker 2, and vice versa). Downstream tuning and the
//! published back catalog both assume this mapping; it is a documented
//! contract, not a bug to fix.

use crate::audio::{AudioSegment, MasteringConfig, MasteringEngine};
use crate::clients::{ChatMessage, ScriptModel, SpeechSynthesizer};
use crate::config::TtsConfig;
use crate::error::{Error, Result};
use crate::pipeline::runner::{synthesize_with_retry, AssembledAudio, IntentPipeline};
use crate::prompts;
use async_trait::async_trait;
use podcraft_common::{Intent, RequestMetadata, Script, Segment, StructuredScript};
use tracing::{info, warn};

const SCRIPT_TEMPERATURE: f32 = 0.7;

/// Conversational episodes: speaker-tagged script, two voices, EQ,
/// compression and fades applied by the mastering engine.
pub struct DialoguePipeline {
    engine: MasteringEngine,
    voice_speaker_1: String,
    voice_speaker_2: String,
    default_voice: String,
}

impl DialoguePipeline {
    pub fn new(tts_config: &TtsConfig) -> Self {
        Self::with_config(tts_config, MasteringConfig::dialogue())
    }

    pub fn with_config(tts_config: &TtsConfig, mastering_config: MasteringConfig) -> Self {
        DialoguePipeline {
            engine: MasteringEngine::new(mastering_config),
            voice_speaker_1: tts_config.dialogue_voice_1.clone(),
            voice_speaker_2: tts_config.dialogue_voice_2.clone(),
            default_voice: tts_config.default_voice.clone(),
        }
    }

    fn fallback_script(&self, message: &str, metadata: &RequestMetadata) -> StructuredScript {
        StructuredScript {
            metadata: Some(podcraft_common::ScriptMetadata {
                title: Some(metadata.title()),
                description: Some(metadata.summary()),
            }),
            themes: vec![(
                "slug_theme".to_string(),
                vec![
                    Segment {
                        speaker: Some("speaker_1".to_string()),
                        text: format!("Welcome to the show. Today we are talking about: {message}."),
                        category: None,
                        pause_after_sec: 1,
                    },
                    Segment {
                        speaker: Some("speaker_2".to_string()),
                        text: "Let's explore the subject together, with clarity and nuance."
                            .to_string(),
                        category: None,
                        pause_after_sec: 1,
                    },
                ],
            )],
        }
    }

    /// Voice and style hint for a script speaker label. The style hint
    /// follows the label; the voice is inverted.
    fn voice_for(&self, speaker: &str) -> (&str, &'static str) {
        if speaker == "speaker_1" {
            (&self.voice_speaker_2, prompts::DIALOGUE_SPEAKER_1_HINT)
        } else {
            (&self.voice_speaker_1, prompts::DIALOGUE_SPEAKER_2_HINT)
        }
    }
}

#[async_trait]
impl IntentPipeline for DialoguePipeline {
    fn intent(&self) -> Intent {
        Intent::Dialogue
    }

    fn sample_rate(&self) -> u32 {
        self.engine.config().sample_rate
    }

    async fn produce_script(
        &self,
        model: &dyn ScriptModel,
        message: &str,
        lang: &str,
        duration_sec: u32,
        metadata: &mut RequestMetadata,
    ) -> Result<Script> {
        let messages = vec![
            ChatMessage::system(prompts::dialogue_system_prompt(duration_sec, lang)),
            ChatMessage::user(prompts::user_context(
                message,
                &metadata.title(),
                &metadata.summary(),
                duration_sec,
            )),
        ];

        // Any script failure degrades to the fallback dialogue so the
        // episode is still produced
        let script = match model.complete_chat_json(messages, SCRIPT_TEMPERATURE).await {
            Ok(value) => match StructuredScript::from_value(&value) {
                Ok(script) => {
                    info!(segments = script.segment_count(), "dialogue script parsed");
                    script
                }
                Err(e) => {
                    warn!("dialogue script unparseable ({e}), using fallback dialogue");
                    self.fallback_script(message, metadata)
                }
            },
            Err(e) => {
                warn!("dialogue script request failed ({e}), using fallback dialogue");
                self.fallback_script(message, metadata)
            }
        };

        if let Some(title) = script.title() {
            metadata.episode_title = Some(title.to_string());
        }
        if let Some(description) = script.description() {
            metadata.episode_summary = Some(description.to_string());
        }
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
                    "dialogue expects a structured script".to_string(),
                ))
            }
        };

        let mut segments = Vec::new();
        for segment in script.segments() {
            if segment.text.trim().is_empty() {
                continue;
            }
            let speaker = segment.speaker.as_deref().unwrap_or("speaker_1");
            let (voice, hint) = self.voice_for(speaker);

            match synthesize_with_retry(tts, &segment.text, voice, &self.default_voice, Some(hint))
                .await
            {
                Ok(bytes) => segments.push(AudioSegment::speech(bytes)),
                Err(e) => {
                    warn!(speaker = %speaker, "dropping dialogue segment after retry: {e}");
                    continue;
                }
            }
            if segment.pause_after_sec > 0 {
                segments.push(AudioSegment::silence(segment.pause_after_sec));
            }
        }
        Ok(segments)
    }

    async fn assemble(&self, segments: Vec<AudioSegment>) -> Result<AssembledAudio> {
        let output = self.engine.master(&segments).await?;
        Ok(AssembledAudio {
            bytes: output.audio.bytes,
            format: output.audio.format,
            degraded: output.report.is_degraded(),
        })
    }
}
