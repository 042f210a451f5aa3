//! Text-to-speech client.
//!
//! One synchronous call per segment; the pipeline owns retry policy
//! (a single retry with the default voice), not this client.

use crate::config::TtsConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};

/// Speech synthesis collaborator, consumed as a black box.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text` with the given voice, returning encoded audio bytes.
    ///
    /// `style_hint` steers delivery (pacing, tone) without being read aloud.
    async fn synthesize(&self, text: &str, voice: &str, style_hint: Option<&str>)
        -> Result<Vec<u8>>;
}

/// OpenAI-compatible `audio/speech` client. Returns MP3 bytes.
pub struct OpenAiSpeech {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiSpeech {
    pub fn new(config: &TtsConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Synthesis(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }
}

/// Build the request body for a synthesis call.
fn request_body(model: &str, text: &str, voice: &str, style_hint: Option<&str>) -> Value {
    let mut body = json!({
        "model": model,
        "voice": voice,
        "input": text,
        "response_format": "mp3",
    });
    if let Some(hint) = style_hint {
        body["instructions"] = json!(hint);
    }
    body
}

#[async_trait]
impl SpeechSynthesizer for OpenAiSpeech {
    async fn synthesize(
        &self,
        text: &str,
        voice: &str,
        style_hint: Option<&str>,
    ) -> Result<Vec<u8>> {
        let url = format!("{}/audio/speech", self.base_url);
        debug!(
            voice = %voice,
            text_len = text.len(),
            hint = style_hint.is_some(),
            "requesting speech synthesis"
        );

        let body = request_body(&self.model, text, voice, style_hint);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Synthesis(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(Error::Synthesis(format!("HTTP {}: {}", status, detail)));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Synthesis(e.to_string()))?
            .to_vec();

        if bytes.is_empty() {
            return Err(Error::Synthesis("service returned empty audio".to_string()));
        }

        info!(voice = %voice, bytes = bytes.len(), "speech synthesized");
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_carries_voice_and_text() {
        let body = request_body("tts-1", "hello there", "alloy", None);
        assert_eq!(body["voice"], "alloy");
        assert_eq!(body["input"], "hello there");
        assert_eq!(body["response_format"], "mp3");
        assert!(body.get("instructions").is_none());
    }

    #[test]
    fn body_includes_style_hint_when_present() {
        let body = request_body("tts-1", "breathe in", "alloy", Some("speak slowly"));
        assert_eq!(body["instructions"], "speak slowly");
    }

    #[test]
    fn client_creation() {
        let config = crate::config::TtsConfig::default();
        assert!(OpenAiSpeech::new(&config).is_ok());
    }
}
