//! Episode records and request/response envelopes.
//!
//! An [`Episode`] is immutable once persisted: the engine inserts exactly one
//! row per successful generation and never updates or deletes it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// The closed set of podcast categories a request can select.
///
/// `Dialogue` is stored and parsed as `other` for compatibility with
/// episodes produced before the intent was renamed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intent {
    Briefing,
    Wellness,
    Dialogue,
}

impl Intent {
    /// Default target duration in seconds when the request carries none.
    pub fn default_duration_sec(&self) -> u32 {
        match self {
            Intent::Briefing => 180,
            Intent::Wellness => 600,
            Intent::Dialogue => 240,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Briefing => "briefing",
            Intent::Wellness => "wellness",
            Intent::Dialogue => "other",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Intent {
    type Err = UnknownIntent;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "briefing" => Ok(Intent::Briefing),
            "wellness" => Ok(Intent::Wellness),
            "other" | "dialogue" => Ok(Intent::Dialogue),
            _ => Err(UnknownIntent(s.to_string())),
        }
    }
}

/// Returned when an intent string is outside the closed set.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown intent: {0}")]
pub struct UnknownIntent(pub String);

/// A persisted episode row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Episode {
    pub id: String,
    pub user_id: String,
    pub intent: String,
    pub language: String,
    pub title: String,
    pub summary: String,
    pub audio_path: String,
    pub audio_url: String,
    pub duration_sec: i64,
    pub published_at: DateTime<Utc>,
    pub raw_meta: Value,
}

/// Episode fields known before the store assigns an id.
#[derive(Debug, Clone)]
pub struct NewEpisode {
    pub user_id: String,
    pub intent: Intent,
    pub language: String,
    pub title: String,
    pub summary: String,
    pub audio_path: String,
    pub audio_url: String,
    pub duration_sec: i64,
    pub published_at: DateTime<Utc>,
    pub raw_meta: Value,
}

/// Per-language user-facing messages handed over by the intent layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageSet {
    #[serde(default)]
    pub success: std::collections::HashMap<String, String>,
    #[serde(default)]
    pub error: std::collections::HashMap<String, String>,
}

/// Request metadata accompanying a generation call.
///
/// Mirrors what the (excluded) intent-detection layer produces; when a caller
/// bypasses that layer, [`RequestMetadata::for_message`] supplies sensible
/// defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestMetadata {
    #[serde(default)]
    pub episode_title: Option<String>,
    #[serde(default)]
    pub episode_summary: Option<String>,
    #[serde(default)]
    pub estimated_duration_sec: Option<u32>,
    #[serde(default)]
    pub messages: MessageSet,
    /// Filled in by the pipeline: the generated script, kept for feed rendering.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
}

impl RequestMetadata {
    /// Default metadata for a bare message (no intent-detection pass).
    pub fn for_message(message: &str) -> Self {
        let title = if message.is_empty() {
            "Podcraft episode".to_string()
        } else {
            let t: String = message.split_whitespace().take(6).collect::<Vec<_>>().join(" ");
            if t.len() > 50 {
                format!("{}...", truncated(&t, 47))
            } else {
                t
            }
        };
        let summary = if message.is_empty() {
            "Automatically generated episode".to_string()
        } else {
            format!("Automatically generated episode about: {}", truncated(message, 100))
        };
        RequestMetadata {
            episode_title: Some(title),
            episode_summary: Some(summary),
            estimated_duration_sec: None,
            messages: MessageSet::default(),
            script: None,
        }
    }

    /// Localized success message, falling back to the given default.
    pub fn success_message(&self, lang: &str, default: &str) -> String {
        self.messages
            .success
            .get(lang)
            .cloned()
            .unwrap_or_else(|| default.to_string())
    }

    /// Localized error message, falling back to the given default.
    pub fn error_message(&self, lang: &str, default: &str) -> String {
        self.messages
            .error
            .get(lang)
            .cloned()
            .unwrap_or_else(|| default.to_string())
    }

    pub fn title(&self) -> String {
        self.episode_title
            .clone()
            .unwrap_or_else(|| "Podcraft episode".to_string())
    }

    pub fn summary(&self) -> String {
        self.episode_summary
            .clone()
            .unwrap_or_else(|| "Automatically generated episode".to_string())
    }

    pub fn as_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

fn truncated(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Uniform result envelope returned by the dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationOutcome {
    pub status: OutcomeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub episode_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rss_url: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Success,
    Error,
}

impl GenerationOutcome {
    pub fn success(episode_id: String, audio_url: String, rss_url: String, message: String) -> Self {
        GenerationOutcome {
            status: OutcomeStatus::Success,
            episode_id: Some(episode_id),
            audio_url: Some(audio_url),
            rss_url: Some(rss_url),
            message,
        }
    }

    pub fn error(message: String) -> Self {
        GenerationOutcome {
            status: OutcomeStatus::Error,
            episode_id: None,
            audio_url: None,
            rss_url: None,
            message,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Success
    }
}
