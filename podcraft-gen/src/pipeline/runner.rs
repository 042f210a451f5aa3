//! The four-phase pipeline runner.
//!
//! Every intent runs the same contract (script, audio, assembly, publish)
//! with per-intent behavior supplied through [`IntentPipeline`]. The runner
//! owns the collaborators, the run state machine, and the degraded paths
//! that keep an episode deliverable when optional stages fail.

use crate::audio::encode::AudioFormat;
use crate::audio::{duration, AudioSegment};
use crate::clients::{ObjectStorage, ScriptModel, SpeechSynthesizer};
use crate::config::FeedConfig;
use crate::db::EpisodeStore;
use crate::error::{Error, Result};
use crate::feed::{ChannelMeta, FeedBuilder};
use async_trait::async_trait;
use podcraft_common::{ids, time, Episode, Intent, NewEpisode, RequestMetadata, Script};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Collaborators constructed once at startup and shared by every request.
#[derive(Clone)]
pub struct Collaborators {
    pub model: Arc<dyn ScriptModel>,
    pub tts: Arc<dyn SpeechSynthesizer>,
    pub storage: Arc<dyn ObjectStorage>,
    pub store: Arc<dyn EpisodeStore>,
    pub feed: Arc<dyn FeedBuilder>,
}

/// Run state machine. `Error` is reachable from every state except `Done`;
/// no state retries automatically beyond the single per-segment synthesis
/// retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    ScriptRequested,
    ScriptReady,
    SynthesisInFlight,
    SegmentsReady,
    Mastering,
    Uploading,
    Persisting,
    FeedRegenerating,
    Done,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Output of the assembly phase.
#[derive(Debug, Clone)]
pub struct AssembledAudio {
    pub bytes: Vec<u8>,
    pub format: AudioFormat,
    pub degraded: bool,
}

/// Per-intent pipeline behavior.
#[async_trait]
pub trait IntentPipeline: Send + Sync {
    fn intent(&self) -> Intent;

    /// Working sample rate, used for the duration estimate when the final
    /// bytes cannot be probed.
    fn sample_rate(&self) -> u32;

    /// Obtain a script. Unparseable model output is recovered with the
    /// intent's structurally-valid fallback, not surfaced as an error.
    async fn produce_script(
        &self,
        model: &dyn ScriptModel,
        message: &str,
        lang: &str,
        duration_sec: u32,
        metadata: &mut RequestMetadata,
    ) -> Result<Script>;

    /// Convert the script into ordered audio segments, one synthesis call
    /// per non-empty text unit.
    async fn produce_segments(
        &self,
        tts: &dyn SpeechSynthesizer,
        script: &Script,
    ) -> Result<Vec<AudioSegment>>;

    /// Assemble segments into final audio bytes.
    async fn assemble(&self, segments: Vec<AudioSegment>) -> Result<AssembledAudio>;
}

/// Result of a successful run, consumed by the dispatcher.
pub struct RunSuccess {
    pub episode: Episode,
    pub audio_url: String,
    pub feed_url: String,
}

/// Drives the four phases for any registered intent pipeline.
pub struct PipelineRunner {
    collaborators: Collaborators,
    feed_config: FeedConfig,
}

impl PipelineRunner {
    pub fn new(collaborators: Collaborators, feed_config: FeedConfig) -> Self {
        Self {
            collaborators,
            feed_config,
        }
    }

    pub async fn run(
        &self,
        pipeline: &dyn IntentPipeline,
        user_id: &str,
        message: &str,
        lang: &str,
        mut metadata: RequestMetadata,
    ) -> Result<RunSuccess> {
        let intent = pipeline.intent();
        let mut state = RunState::Idle;

        // Phase 1: script
        advance(&mut state, RunState::ScriptRequested, intent);
        let duration_sec = metadata
            .estimated_duration_sec
            .unwrap_or_else(|| intent.default_duration_sec());
        let script = pipeline
            .produce_script(
                self.collaborators.model.as_ref(),
                message,
                lang,
                duration_sec,
                &mut metadata,
            )
            .await?;
        advance(&mut state, RunState::ScriptReady, intent);

        // Phase 2: audio
        advance(&mut state, RunState::SynthesisInFlight, intent);
        let segments = pipeline
            .produce_segments(self.collaborators.tts.as_ref(), &script)
            .await?;
        if !segments.iter().any(|s| s.is_speech()) {
            return Err(Error::NoAudioProduced);
        }
        advance(&mut state, RunState::SegmentsReady, intent);

        // Phase 3: assembly
        advance(&mut state, RunState::Mastering, intent);
        let assembled = match pipeline.assemble(segments.clone()).await {
            Ok(assembled) => assembled,
            Err(Error::NoValidSegments) => {
                warn!("mastering had nothing to assemble, concatenating raw segment payloads");
                raw_concat(&segments)?
            }
            Err(e) => return Err(e),
        };
        if assembled.bytes.is_empty() {
            return Err(Error::NoAudioProduced);
        }

        // Phase 4: publish
        advance(&mut state, RunState::Uploading, intent);
        let audio_path = ids::make_audio_path(user_id, time::now(), assembled.format.extension());
        let audio_url = self
            .collaborators
            .storage
            .upload_public(
                &audio_path,
                assembled.bytes.clone(),
                assembled.format.content_type(),
            )
            .await?;

        advance(&mut state, RunState::Persisting, intent);
        // Real duration from the final encoded bytes, never the estimate
        let duration_sec = duration::episode_duration_sec(&assembled.bytes, pipeline.sample_rate());
        metadata.script = Some(script.as_text());

        let episode = self
            .collaborators
            .store
            .insert(NewEpisode {
                user_id: user_id.to_string(),
                intent,
                language: lang.to_string(),
                title: metadata.title(),
                summary: metadata.summary(),
                audio_path,
                audio_url: audio_url.clone(),
                duration_sec,
                published_at: time::now(),
                raw_meta: metadata.as_json(),
            })
            .await
            .map_err(|e| match e {
                e @ Error::Persist(_) => e,
                other => Error::Persist(other.to_string()),
            })?;

        advance(&mut state, RunState::FeedRegenerating, intent);
        let feed_url = self.regenerate_feed(user_id).await;

        advance(&mut state, RunState::Done, intent);
        info!(episode_id = %episode.id, intent = %intent, "episode published");
        Ok(RunSuccess {
            episode,
            audio_url,
            feed_url,
        })
    }

    /// Rebuild and upload the user's feed. Never fails the request: any
    /// error degrades to the best-effort public feed URL.
    async fn regenerate_feed(&self, user_id: &str) -> String {
        let feed_path = ids::make_feed_path(user_id);
        let fallback_url = self.collaborators.storage.public_url(&feed_path);

        let episodes = match self.collaborators.store.list_for_user(user_id).await {
            Ok(episodes) => episodes,
            Err(e) => {
                warn!("feed degraded, episode list unavailable: {e}");
                return fallback_url;
            }
        };

        let channel = ChannelMeta::for_user(&self.feed_config, user_id);
        let xml = match self.collaborators.feed.build(user_id, &episodes, &channel) {
            Ok(xml) => xml,
            Err(e) => {
                warn!("feed degraded, build failed: {e}");
                return fallback_url;
            }
        };

        match self
            .collaborators
            .storage
            .upload_public(&feed_path, xml, "application/rss+xml")
            .await
        {
            Ok(url) => {
                info!(episodes = episodes.len(), "feed regenerated");
                url
            }
            Err(e) => {
                warn!("feed degraded, upload failed: {e}");
                fallback_url
            }
        }
    }
}

fn advance(state: &mut RunState, next: RunState, intent: Intent) {
    debug!(intent = %intent, from = %state, to = %next, "pipeline state");
    *state = next;
}

/// Degraded assembly: concatenate whatever encoded payloads exist. The
/// payloads are encoded speech, so the artifact keeps the speech container
/// type.
fn raw_concat(segments: &[AudioSegment]) -> Result<AssembledAudio> {
    let mut bytes = Vec::new();
    for segment in segments {
        if let Some(payload) = segment.payload() {
            bytes.extend_from_slice(payload);
        }
    }
    if bytes.is_empty() {
        return Err(Error::NoAudioProduced);
    }
    error!(
        bytes = bytes.len(),
        "publishing raw-concatenated audio (degraded)"
    );
    Ok(AssembledAudio {
        bytes,
        format: AudioFormat::Mp3,
        degraded: true,
    })
}

/// One synthesis attempt per segment plus exactly one retry with the
/// default voice before the caller abandons the segment.
pub(crate) async fn synthesize_with_retry(
    tts: &dyn SpeechSynthesizer,
    text: &str,
    voice: &str,
    default_voice: &str,
    style_hint: Option<&str>,
) -> Result<Vec<u8>> {
    match tts.synthesize(text, voice, style_hint).await {
        Ok(bytes) => Ok(bytes),
        Err(e) => {
            warn!(voice = %voice, "synthesis failed ({e}), retrying with default voice");
            tts.synthesize(text, default_voice, style_hint).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::testing::*;

    #[test]
    fn raw_concat_joins_payloads_in_order() {
        let segments = vec![
            AudioSegment::speech(vec![1, 2]),
            AudioSegment::silence(3),
            AudioSegment::speech(vec![3, 4]),
        ];
        let assembled = raw_concat(&segments).unwrap();
        assert_eq!(assembled.bytes, vec![1, 2, 3, 4]);
        assert!(assembled.degraded);
    }

    #[test]
    fn raw_concat_with_no_payloads_is_fatal() {
        let segments = vec![AudioSegment::silence(3)];
        assert!(matches!(
            raw_concat(&segments),
            Err(Error::NoAudioProduced)
        ));
    }

    #[tokio::test]
    async fn retry_uses_default_voice_exactly_once() {
        let tts = FakeTts::new(vec![1, 2, 3]).failing_voices(&["nova"]);
        let bytes = synthesize_with_retry(&tts, "hello", "nova", "alloy", None)
            .await
            .unwrap();
        assert_eq!(bytes, vec![1, 2, 3]);
        assert_eq!(tts.voices_called(), vec!["nova", "alloy"]);
    }

    #[tokio::test]
    async fn retry_failure_propagates() {
        let tts = FakeTts::new(vec![1]).failing_voices(&["nova", "alloy"]);
        let result = synthesize_with_retry(&tts, "hello", "nova", "alloy", None).await;
        assert!(result.is_err());
        // Exactly one retry, no more
        assert_eq!(tts.voices_called().len(), 2);
    }

    #[tokio::test]
    async fn successful_first_attempt_skips_retry() {
        let tts = FakeTts::new(vec![9]);
        synthesize_with_retry(&tts, "hello", "nova", "alloy", None)
            .await
            .unwrap();
        assert_eq!(tts.voices_called(), vec!["nova"]);
    }
}
