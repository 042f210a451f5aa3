//! Pipeline dispatcher.
//!
//! Maps an intent identifier to a registered pipeline and produces the
//! uniform result envelope. Every internal failure is translated into the
//! error variant here; nothing propagates past this boundary.

use crate::pipeline::runner::{IntentPipeline, PipelineRunner};
use podcraft_common::{GenerationOutcome, Intent, RequestMetadata};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Dispatches generation requests to intent pipelines.
pub struct Dispatcher {
    runner: PipelineRunner,
    pipelines: HashMap<Intent, Arc<dyn IntentPipeline>>,
    debug: bool,
}

impl Dispatcher {
    pub fn new(runner: PipelineRunner, debug: bool) -> Self {
        Dispatcher {
            runner,
            pipelines: HashMap::new(),
            debug,
        }
    }

    /// Register a pipeline for its intent. Later registrations replace
    /// earlier ones.
    pub fn register(mut self, pipeline: Arc<dyn IntentPipeline>) -> Self {
        self.pipelines.insert(pipeline.intent(), pipeline);
        self
    }

    /// Registered intent identifiers.
    pub fn available(&self) -> Vec<&'static str> {
        self.pipelines.keys().map(|i| i.as_str()).collect()
    }

    /// Generate one episode. Always returns a structured envelope; an
    /// unrecognized intent fails fast with no side effects.
    pub async fn generate(
        &self,
        user_id: &str,
        message: &str,
        lang: &str,
        intent: &str,
        metadata: RequestMetadata,
    ) -> GenerationOutcome {
        let parsed: Intent = match intent.parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(intent = %intent, "rejecting request: {e}");
                return GenerationOutcome::error(self.decorate(unknown_intent_message(lang), &e.to_string()));
            }
        };

        let pipeline = match self.pipelines.get(&parsed) {
            Some(pipeline) => pipeline,
            None => {
                warn!(intent = %parsed, "no pipeline registered");
                return GenerationOutcome::error(unknown_intent_message(lang));
            }
        };

        info!(user_id = %user_id, intent = %parsed, lang = %lang, "generation request");

        match self
            .runner
            .run(pipeline.as_ref(), user_id, message, lang, metadata.clone())
            .await
        {
            Ok(success) => GenerationOutcome::success(
                success.episode.id,
                success.audio_url,
                success.feed_url,
                metadata.success_message(lang, default_success_message(parsed, lang)),
            ),
            Err(e) => {
                error!(intent = %parsed, "generation failed: {e}");
                let base = metadata.error_message(lang, default_error_message(parsed, lang));
                GenerationOutcome::error(self.decorate(base, &e.to_string()))
            }
        }
    }

    /// Append internal detail only in debug mode.
    fn decorate(&self, base: String, detail: &str) -> String {
        if self.debug {
            format!("{base} | {detail}")
        } else {
            base
        }
    }
}

fn unknown_intent_message(lang: &str) -> String {
    match lang {
        "fr" => "Type de podcast inconnu".to_string(),
        _ => "Unknown podcast type".to_string(),
    }
}

fn default_success_message(intent: Intent, lang: &str) -> &'static str {
    match (intent, lang) {
        (Intent::Briefing, "fr") => "Podcast briefing généré avec succès",
        (Intent::Briefing, _) => "Briefing episode generated successfully",
        (Intent::Wellness, "fr") => "Podcast bien-être généré avec succès",
        (Intent::Wellness, _) => "Wellness episode generated successfully",
        (Intent::Dialogue, "fr") => "Podcast créatif généré avec succès",
        (Intent::Dialogue, _) => "Conversation episode generated successfully",
    }
}

fn default_error_message(intent: Intent, lang: &str) -> &'static str {
    match (intent, lang) {
        (Intent::Briefing, "fr") => "Erreur lors de la génération du podcast briefing",
        (Intent::Briefing, _) => "Failed to generate the briefing episode",
        (Intent::Wellness, "fr") => "Erreur lors de la génération du podcast bien-être",
        (Intent::Wellness, _) => "Failed to generate the wellness episode",
        (Intent::Dialogue, "fr") => "Erreur lors de la génération du podcast créatif",
        (Intent::Dialogue, _) => "Failed to generate the conversation episode",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::encode::EncoderTier;
    use crate::audio::mix::MixConfig;
    use crate::audio::{MasteringConfig, Pcm};
    use crate::config::{FeedConfig, TtsConfig};
    use crate::pipeline::runner::Collaborators;
    use crate::pipeline::testing::*;
    use crate::pipeline::{BriefingPipeline, DialoguePipeline, WellnessPipeline};
    use podcraft_common::OutcomeStatus;

    struct Harness {
        model: Arc<FakeModel>,
        tts: Arc<FakeTts>,
        storage: Arc<FakeStorage>,
        store: Arc<FakeStore>,
        feed: Arc<FakeFeed>,
    }

    impl Harness {
        fn new(model: FakeModel, tts: FakeTts) -> Self {
            Harness {
                model: Arc::new(model),
                tts: Arc::new(tts),
                storage: Arc::new(FakeStorage::default()),
                store: Arc::new(FakeStore::default()),
                feed: Arc::new(FakeFeed::default()),
            }
        }

        fn dispatcher(&self, debug: bool) -> Dispatcher {
            let collaborators = Collaborators {
                model: self.model.clone(),
                tts: self.tts.clone(),
                storage: self.storage.clone(),
                store: self.store.clone(),
                feed: self.feed.clone(),
            };
            let runner = PipelineRunner::new(collaborators, FeedConfig::default());
            let tts_config = TtsConfig::default();

            let wellness_background = Pcm::new(vec![0.05; 22_050], 22_050);
            Dispatcher::new(runner, debug)
                .register(Arc::new(BriefingPipeline::new(&tts_config)))
                .register(Arc::new(WellnessPipeline::with_configs(
                    &tts_config,
                    wellness_background,
                    MasteringConfig {
                        encoders: vec![EncoderTier::WavContainer],
                        ..MasteringConfig::wellness()
                    },
                    MixConfig {
                        lead_in_sec: 1,
                        lead_out_sec: 1,
                        ..MixConfig::default()
                    },
                )))
                .register(Arc::new(DialoguePipeline::with_config(
                    &tts_config,
                    MasteringConfig {
                        encoders: vec![EncoderTier::WavContainer],
                        ..MasteringConfig::dialogue()
                    },
                )))
        }
    }

    fn briefing_harness() -> Harness {
        Harness::new(
            FakeModel {
                script_response: Some("Here is today's briefing.".to_string()),
                ..FakeModel::default()
            },
            FakeTts::new(fake_speech_wav(24_000, 0.5)),
        )
    }

    #[tokio::test]
    async fn briefing_round_trip_succeeds() {
        let harness = briefing_harness();
        let dispatcher = harness.dispatcher(false);
        let metadata = RequestMetadata::for_message("today's news");

        let outcome = dispatcher
            .generate("user-1", "today's news", "en", "briefing", metadata)
            .await;

        assert_eq!(outcome.status, OutcomeStatus::Success);
        assert!(outcome.audio_url.as_deref().unwrap().starts_with("https://cdn.test/user-1/"));
        assert!(outcome.rss_url.as_deref().unwrap().ends_with("user-1/feed.xml"));
        assert_eq!(outcome.message, "Briefing episode generated successfully");

        // One audio upload plus the regenerated feed
        let uploads = harness.storage.uploads.lock().unwrap();
        assert_eq!(uploads.len(), 2);
        assert_eq!(uploads[0].1, "audio/mpeg");
        assert_eq!(uploads[1].1, "application/rss+xml");

        let episodes = harness.store.episodes.lock().unwrap();
        assert_eq!(episodes.len(), 1);
        assert_eq!(episodes[0].intent, "briefing");
        assert!(episodes[0].duration_sec >= 1);
        assert!(episodes[0].raw_meta["script"]
            .as_str()
            .unwrap()
            .contains("briefing"));
    }

    #[tokio::test]
    async fn unknown_intent_fails_without_side_effects() {
        let harness = briefing_harness();
        let dispatcher = harness.dispatcher(false);

        let outcome = dispatcher
            .generate(
                "user-1",
                "hello",
                "en",
                "karaoke",
                RequestMetadata::for_message("hello"),
            )
            .await;

        assert_eq!(outcome.status, OutcomeStatus::Error);
        assert_eq!(outcome.message, "Unknown podcast type");
        assert!(outcome.episode_id.is_none());
        assert!(harness.storage.uploads.lock().unwrap().is_empty());
        assert!(harness.store.episodes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_intent_message_is_localized() {
        let harness = briefing_harness();
        let dispatcher = harness.dispatcher(false);
        let outcome = dispatcher
            .generate("u", "m", "fr", "karaoke", RequestMetadata::for_message("m"))
            .await;
        assert_eq!(outcome.message, "Type de podcast inconnu");
    }

    #[tokio::test]
    async fn metadata_messages_override_defaults() {
        let harness = briefing_harness();
        let dispatcher = harness.dispatcher(false);
        let mut metadata = RequestMetadata::for_message("news");
        metadata
            .messages
            .success
            .insert("fr".to_string(), "Épisode prêt !".to_string());

        let outcome = dispatcher
            .generate("user-1", "news", "fr", "briefing", metadata)
            .await;
        assert_eq!(outcome.message, "Épisode prêt !");
    }

    #[tokio::test]
    async fn total_synthesis_failure_is_an_error_envelope() {
        let harness = Harness::new(
            FakeModel {
                script_response: Some("script".to_string()),
                ..FakeModel::default()
            },
            FakeTts::new(vec![1]).failing_voices(&["alloy"]),
        );
        let dispatcher = harness.dispatcher(false);

        let outcome = dispatcher
            .generate("user-1", "m", "en", "briefing", RequestMetadata::for_message("m"))
            .await;

        assert_eq!(outcome.status, OutcomeStatus::Error);
        assert_eq!(outcome.message, "Failed to generate the briefing episode");
        assert!(harness.store.episodes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn debug_mode_appends_internal_detail() {
        let harness = Harness::new(
            FakeModel {
                fail: true,
                ..FakeModel::default()
            },
            FakeTts::new(vec![1]),
        );
        let dispatcher = harness.dispatcher(true);

        let outcome = dispatcher
            .generate("user-1", "m", "en", "briefing", RequestMetadata::for_message("m"))
            .await;
        assert!(outcome.message.contains(" | "));
        assert!(outcome.message.contains("model unavailable"));
    }

    #[tokio::test]
    async fn non_debug_mode_hides_internal_detail() {
        let harness = Harness::new(
            FakeModel {
                fail: true,
                ..FakeModel::default()
            },
            FakeTts::new(vec![1]),
        );
        let dispatcher = harness.dispatcher(false);

        let outcome = dispatcher
            .generate("user-1", "m", "en", "briefing", RequestMetadata::for_message("m"))
            .await;
        assert_eq!(outcome.message, "Failed to generate the briefing episode");
    }

    #[tokio::test]
    async fn upload_failure_persists_nothing() {
        let harness = briefing_harness();
        let dispatcher = {
            let collaborators = Collaborators {
                model: harness.model.clone(),
                tts: harness.tts.clone(),
                storage: Arc::new(FakeStorage {
                    fail: true,
                    ..FakeStorage::default()
                }),
                store: harness.store.clone(),
                feed: harness.feed.clone(),
            };
            Dispatcher::new(
                PipelineRunner::new(collaborators, FeedConfig::default()),
                false,
            )
            .register(Arc::new(BriefingPipeline::new(&TtsConfig::default())))
        };

        let outcome = dispatcher
            .generate("user-1", "m", "en", "briefing", RequestMetadata::for_message("m"))
            .await;
        assert_eq!(outcome.status, OutcomeStatus::Error);
        assert!(harness.store.episodes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn persist_failure_is_fatal() {
        let harness = briefing_harness();
        let store = Arc::new(FakeStore {
            fail_insert: true,
            ..FakeStore::default()
        });
        let collaborators = Collaborators {
            model: harness.model.clone(),
            tts: harness.tts.clone(),
            storage: harness.storage.clone(),
            store,
            feed: harness.feed.clone(),
        };
        let dispatcher = Dispatcher::new(
            PipelineRunner::new(collaborators, FeedConfig::default()),
            false,
        )
        .register(Arc::new(BriefingPipeline::new(&TtsConfig::default())));

        let outcome = dispatcher
            .generate("user-1", "m", "en", "briefing", RequestMetadata::for_message("m"))
            .await;
        assert_eq!(outcome.status, OutcomeStatus::Error);
        // The audio upload happened before the failed insert; that
        // inconsistency is accepted and logged, not rolled back
        assert_eq!(harness.storage.uploads.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn feed_failure_does_not_fail_the_episode() {
        let harness = briefing_harness();
        let feed = Arc::new(FakeFeed { fail: true });
        let collaborators = Collaborators {
            model: harness.model.clone(),
            tts: harness.tts.clone(),
            storage: harness.storage.clone(),
            store: harness.store.clone(),
            feed,
        };
        let dispatcher = Dispatcher::new(
            PipelineRunner::new(collaborators, FeedConfig::default()),
            false,
        )
        .register(Arc::new(BriefingPipeline::new(&TtsConfig::default())));

        let outcome = dispatcher
            .generate("user-1", "m", "en", "briefing", RequestMetadata::for_message("m"))
            .await;

        assert_eq!(outcome.status, OutcomeStatus::Success);
        // Best-effort feed URL is still returned
        assert_eq!(
            outcome.rss_url.as_deref().unwrap(),
            "https://cdn.test/user-1/feed.xml"
        );
        // Only the audio upload happened
        assert_eq!(harness.storage.uploads.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn wellness_round_trip_with_structured_script() {
        let script = r#"{
            "metadata": {"title": "Calm", "description": "A calm session"},
            "opening": [
                {"category": "intro", "text": "Welcome.", "pause_after_sec": 1}
            ]
        }"#;
        let harness = Harness::new(
            FakeModel {
                script_response: Some(script.to_string()),
                ..FakeModel::default()
            },
            FakeTts::new(fake_speech_wav(22_050, 0.5)),
        );
        let dispatcher = harness.dispatcher(false);

        let outcome = dispatcher
            .generate("user-2", "calm me down", "en", "wellness", RequestMetadata::for_message("calm me down"))
            .await;

        assert_eq!(outcome.status, OutcomeStatus::Success);
        let episodes = harness.store.episodes.lock().unwrap();
        assert_eq!(episodes[0].intent, "wellness");
        // Model-generated metadata wins over the request defaults
        assert_eq!(episodes[0].title, "Calm");
        // Lead-in 1 + content ~1.5 + lead-out 1
        assert!(episodes[0].duration_sec >= 3);
    }

    #[tokio::test]
    async fn dialogue_round_trip_masters_and_publishes() {
        let harness = Harness::new(
            FakeModel {
                json_response: Some(serde_json::json!({
                    "metadata": {"title": "Hosts", "description": "d"},
                    "slug_theme": [
                        {"speaker": "speaker_1", "text": "Hello.", "pause_after_sec": 1},
                        {"speaker": "speaker_2", "text": "Hi there.", "pause_after_sec": 0}
                    ]
                })),
                ..FakeModel::default()
            },
            FakeTts::new(fake_speech_wav(24_000, 0.5)),
        );
        let dispatcher = harness.dispatcher(false);

        let outcome = dispatcher
            .generate("user-3", "chat", "en", "other", RequestMetadata::for_message("chat"))
            .await;

        assert_eq!(outcome.status, OutcomeStatus::Success);
        let episodes = harness.store.episodes.lock().unwrap();
        assert_eq!(episodes[0].intent, "other");

        // Inverted voice mapping held through the whole run
        let config = TtsConfig::default();
        assert_eq!(
            harness.tts.voices_called(),
            vec![config.dialogue_voice_2, config.dialogue_voice_1]
        );
    }

    #[tokio::test]
    async fn dialogue_with_undecodable_speech_degrades_to_raw_concat() {
        // Payloads that are not decodable audio: mastering reports no valid
        // segments and the runner publishes the raw concatenation
        let harness = Harness::new(
            FakeModel {
                json_response: Some(serde_json::json!({
                    "slug_theme": [
                        {"speaker": "speaker_1", "text": "Hello.", "pause_after_sec": 0},
                        {"speaker": "speaker_2", "text": "Hi.", "pause_after_sec": 0}
                    ]
                })),
                ..FakeModel::default()
            },
            FakeTts::new(b"opaque-bytes".to_vec()),
        );
        let dispatcher = harness.dispatcher(false);

        let outcome = dispatcher
            .generate("user-4", "chat", "en", "other", RequestMetadata::for_message("chat"))
            .await;

        assert_eq!(outcome.status, OutcomeStatus::Success);
        let uploads = harness.storage.uploads.lock().unwrap();
        // Two segments' payloads concatenated
        assert_eq!(uploads[0].2, b"opaque-bytes".len() * 2);
    }
}
