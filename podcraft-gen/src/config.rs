//! Engine configuration
//!
//! Loaded once at startup from an optional TOML file, with secrets taken
//! from the environment. Read-only after load; every generation request
//! sees the same values.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Language-model collaborator settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub base_url: String,
    pub api_key: String,
    pub script_model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            script_model: "gpt-4o-mini".to_string(),
            temperature: 0.7,
            max_tokens: 2000,
            timeout_secs: 60,
        }
    }
}

/// Text-to-speech collaborator settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TtsConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    /// Voice used when none is specified and for the single per-segment retry.
    pub default_voice: String,
    /// Voice configured for dialogue speaker 1.
    pub dialogue_voice_1: String,
    /// Voice configured for dialogue speaker 2.
    pub dialogue_voice_2: String,
    pub timeout_secs: u64,
}

impl Default for TtsConfig {
    fn default() -> Self {
        TtsConfig {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            model: "gpt-4o-mini-tts".to_string(),
            default_voice: "alloy".to_string(),
            dialogue_voice_1: "onyx".to_string(),
            dialogue_voice_2: "nova".to_string(),
            timeout_secs: 60,
        }
    }
}

/// Object-storage collaborator settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub base_url: String,
    pub api_key: String,
    pub bucket: String,
    pub timeout_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            base_url: "http://localhost:8000".to_string(),
            api_key: String::new(),
            bucket: "podcasts".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Feed channel metadata handed to the (external) feed builder.
///
/// `{user_id}` in the templates is replaced per user.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub title_template: String,
    pub description_template: String,
    pub author: String,
    pub category: String,
    pub language: String,
    pub cover_url: String,
    pub site_url: String,
    pub ttl_minutes: u32,
}

impl Default for FeedConfig {
    fn default() -> Self {
        FeedConfig {
            title_template: "Podcraft – {user_id}".to_string(),
            description_template: "Personal episodes for {user_id}".to_string(),
            author: "Podcraft".to_string(),
            category: "Education".to_string(),
            language: "en".to_string(),
            cover_url: String::new(),
            site_url: "https://podcraft.example".to_string(),
            ttl_minutes: 60,
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub model: ModelConfig,
    pub tts: TtsConfig,
    pub storage: StorageConfig,
    pub feed: FeedConfig,
    /// SQLite database path for episode metadata.
    pub db_path: Option<PathBuf>,
    /// Ambient background track mixed under wellness speech.
    pub ambient_track: Option<PathBuf>,
    /// When on, error envelopes carry internal failure detail.
    pub debug: bool,
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment secrets.
    ///
    /// A missing file yields the defaults; a malformed file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) if p.exists() => {
                let raw = std::fs::read_to_string(p)?;
                toml::from_str(&raw).map_err(|e| Error::Config(e.to_string()))?
            }
            _ => Config::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// Overlay secrets from the environment so keys never live in the file.
    fn apply_env(&mut self) {
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            if self.model.api_key.is_empty() {
                self.model.api_key = key.clone();
            }
            if self.tts.api_key.is_empty() {
                self.tts.api_key = key;
            }
        }
        if let Ok(key) = std::env::var("PODCRAFT_STORAGE_KEY") {
            if self.storage.api_key.is_empty() {
                self.storage.api_key = key;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = Config::default();
        assert_eq!(config.model.script_model, "gpt-4o-mini");
        assert_eq!(config.tts.default_voice, "alloy");
        assert_eq!(config.storage.bucket, "podcasts");
        assert!(!config.debug);
    }

    #[test]
    fn parses_partial_toml() {
        let raw = r#"
            debug = true

            [tts]
            dialogue_voice_1 = "echo"

            [storage]
            bucket = "episodes"
        "#;
        let config: Config = toml::from_str(raw).unwrap();
        assert!(config.debug);
        assert_eq!(config.tts.dialogue_voice_1, "echo");
        // Untouched fields keep their defaults
        assert_eq!(config.tts.dialogue_voice_2, "nova");
        assert_eq!(config.storage.bucket, "episodes");
        assert_eq!(config.model.temperature, 0.7);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let config = Config::load(Some(Path::new("/nonexistent/podcraft.toml"))).unwrap();
        assert_eq!(config.storage.bucket, "podcasts");
    }

    #[test]
    fn feed_templates_carry_user_placeholder() {
        let config = Config::default();
        assert!(config.feed.title_template.contains("{user_id}"));
        assert!(config.feed.description_template.contains("{user_id}"));
    }
}
