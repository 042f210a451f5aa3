//! Briefing pipeline: flat prose script, single voice, direct publish.

use crate::audio::encode::AudioFormat;
use crate::audio::AudioSegment;
use crate::clients::{ScriptModel, SpeechSynthesizer};
use crate::config::TtsConfig;
use crate::error::{Error, Result};
use crate::pipeline::runner::{synthesize_with_retry, AssembledAudio, IntentPipeline};
use crate::prompts;
use async_trait::async_trait;
use podcraft_common::{Intent, RequestMetadata, Script};
use tracing::{info, warn};

/// Informational episodes: one continuous prose script read by one voice,
/// published without further mastering.
pub struct BriefingPipeline {
    voice: String,
    default_voice: String,
    sample_rate: u32,
}

impl BriefingPipeline {
    pub fn new(tts_config: &TtsConfig) -> Self {
        BriefingPipeline {
            voice: tts_config.default_voice.clone(),
            default_voice: tts_config.default_voice.clone(),
            sample_rate: 24_000,
        }
    }

    fn fallback_script(&self, message: &str) -> Script {
        Script::Flat(format!(
            "Welcome to your briefing. Today's topic: {message}. \
             A full script could not be prepared this time, so here is the short version: \
             take a moment with the subject, and check back soon for a complete episode."
        ))
    }
}

#[async_trait]
impl IntentPipeline for BriefingPipeline {
    fn intent(&self) -> Intent {
        Intent::Briefing
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    async fn produce_script(
        &self,
        model: &dyn ScriptModel,
        message: &str,
        lang: &str,
        duration_sec: u32,
        metadata: &mut RequestMetadata,
    ) -> Result<Script> {
        let system = prompts::briefing_system_prompt(duration_sec, lang);
        let context =
            prompts::user_context(message, &metadata.title(), &metadata.summary(), duration_sec);

        let text = model.complete_script(&system, &context).await?;
        if text.trim().is_empty() {
            warn!("model returned an empty briefing script, using fallback");
            return Ok(self.fallback_script(message));
        }

        info!(len = text.len(), "briefing script ready");
        Ok(Script::Flat(text))
    }

    async fn produce_segments(
        &self,
        tts: &dyn SpeechSynthesizer,
        script: &Script,
    ) -> Result<Vec<AudioSegment>> {
        let text = match script {
            Script::Flat(text) => text,
            Script::Structured(s) => {
                return Err(Error::InvalidScript(format!(
                    "briefing expects flat prose, got {} structured segments",
                    s.segment_count()
                )))
            }
        };

        match synthesize_with_retry(tts, text, &self.voice, &self.default_voice, None).await {
            Ok(bytes) => Ok(vec![AudioSegment::speech(bytes)]),
            Err(e) => {
                warn!("briefing synthesis abandoned: {e}");
                Ok(Vec::new())
            }
        }
    }

    async fn assemble(&self, segments: Vec<AudioSegment>) -> Result<AssembledAudio> {
        // The single synthesized segment is already final
        let bytes = segments
            .into_iter()
            .find_map(|s| match s {
                AudioSegment::Speech { bytes } => Some(bytes),
                AudioSegment::Silence { .. } => None,
            })
            .ok_or(Error::NoAudioProduced)?;

        Ok(AssembledAudio {
            bytes,
            format: AudioFormat::Mp3,
            degraded: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::testing::*;

    fn pipeline() -> BriefingPipeline {
        BriefingPipeline::new(&TtsConfig::default())
    }

    #[tokio::test]
    async fn flat_script_from_model() {
        let model = FakeModel {
            script_response: Some("Good morning, here is the news.".to_string()),
            ..FakeModel::default()
        };
        let mut metadata = RequestMetadata::for_message("news");
        let script = pipeline()
            .produce_script(&model, "news", "en", 180, &mut metadata)
            .await
            .unwrap();
        assert_eq!(
            script,
            Script::Flat("Good morning, here is the news.".to_string())
        );
    }

    #[tokio::test]
    async fn empty_model_output_falls_back() {
        let model = FakeModel {
            script_response: Some("   ".to_string()),
            ..FakeModel::default()
        };
        let mut metadata = RequestMetadata::for_message("tides");
        let script = pipeline()
            .produce_script(&model, "tides", "en", 180, &mut metadata)
            .await
            .unwrap();
        match script {
            Script::Flat(text) => assert!(text.contains("tides")),
            _ => panic!("expected flat fallback"),
        }
    }

    #[tokio::test]
    async fn model_transport_failure_is_fatal() {
        let model = FakeModel {
            fail: true,
            ..FakeModel::default()
        };
        let mut metadata = RequestMetadata::for_message("x");
        let result = pipeline()
            .produce_script(&model, "x", "en", 180, &mut metadata)
            .await;
        assert!(matches!(result, Err(Error::Model(_))));
    }

    #[tokio::test]
    async fn single_segment_passthrough_assembly() {
        let assembled = pipeline()
            .assemble(vec![AudioSegment::speech(vec![7, 8, 9])])
            .await
            .unwrap();
        assert_eq!(assembled.bytes, vec![7, 8, 9]);
        assert_eq!(assembled.format, AudioFormat::Mp3);
        assert!(!assembled.degraded);
    }

    #[tokio::test]
    async fn failed_synthesis_yields_no_segments() {
        let tts = FakeTts::new(vec![1]).failing_voices(&["alloy"]);
        let segments = pipeline()
            .produce_segments(&tts, &Script::Flat("hello".to_string()))
            .await
            .unwrap();
        assert!(segments.is_empty());
        // One attempt plus the single default-voice retry
        assert_eq!(tts.voices_called(), vec!["alloy", "alloy"]);
    }
}
