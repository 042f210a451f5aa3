//! Script shapes produced by the language model.
//!
//! Two shapes exist: a flat prose block (briefing) and a structured mapping
//! of theme keys to ordered segment lists with a sibling `metadata` key
//! (wellness, dialogue).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One atomic speakable unit of a structured script.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Segment {
    /// Speaker tag; only meaningful for dialogue scripts.
    #[serde(default)]
    pub speaker: Option<String>,
    /// Text to speak; empty means the segment is pure silence.
    #[serde(default)]
    pub text: String,
    /// Free-form tag (wellness uses e.g. "breathing", "visualization").
    #[serde(default)]
    pub category: Option<String>,
    /// Seconds of silence appended after this segment.
    #[serde(default)]
    pub pause_after_sec: u32,
}

impl Segment {
    /// A segment with no text and no pause contributes nothing and is
    /// skipped without error.
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty() && self.pause_after_sec == 0
    }

    pub fn speech(text: impl Into<String>, pause_after_sec: u32) -> Self {
        Segment {
            speaker: None,
            text: text.into(),
            category: None,
            pause_after_sec,
        }
    }
}

/// Title/description generated by the model alongside the segments.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ScriptMetadata {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// A structured script: ordered themes, each an ordered list of segments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructuredScript {
    pub metadata: Option<ScriptMetadata>,
    /// Theme keys in the order the model emitted them.
    pub themes: Vec<(String, Vec<Segment>)>,
}

/// Raised when model output cannot be parsed into the expected shape.
#[derive(Debug, thiserror::Error)]
pub enum ScriptParseError {
    #[error("model response is not valid JSON: {0}")]
    NotJson(#[from] serde_json::Error),

    #[error("model response is not a JSON object")]
    NotAnObject,

    #[error("theme '{theme}' is not an array of segments")]
    BadTheme { theme: String },

    #[error("script contains no segments")]
    Empty,
}

impl StructuredScript {
    /// Parse raw model output into a structured script.
    ///
    /// Theme order is preserved; the `metadata` key is pulled out and never
    /// treated as a theme. A script with zero segments across all themes is
    /// rejected so callers can fall back early.
    pub fn parse(raw: &str) -> Result<Self, ScriptParseError> {
        let value: Value = serde_json::from_str(raw)?;
        Self::from_value(&value)
    }

    pub fn from_value(value: &Value) -> Result<Self, ScriptParseError> {
        let obj = value.as_object().ok_or(ScriptParseError::NotAnObject)?;

        let mut metadata = None;
        let mut themes = Vec::new();

        for (key, entry) in obj {
            if key == "metadata" {
                metadata = serde_json::from_value(entry.clone()).ok();
                continue;
            }
            let list = entry
                .as_array()
                .ok_or_else(|| ScriptParseError::BadTheme { theme: key.clone() })?;
            let segments: Vec<Segment> = list
                .iter()
                .filter_map(|seg| serde_json::from_value(seg.clone()).ok())
                .collect();
            themes.push((key.clone(), segments));
        }

        let script = StructuredScript { metadata, themes };
        if script.segments().next().is_none() {
            return Err(ScriptParseError::Empty);
        }
        Ok(script)
    }

    /// All segments across all themes, in script order.
    pub fn segments(&self) -> impl Iterator<Item = &Segment> {
        self.themes.iter().flat_map(|(_, segs)| segs.iter())
    }

    pub fn segment_count(&self) -> usize {
        self.themes.iter().map(|(_, segs)| segs.len()).sum()
    }

    /// Sum of declared pauses plus, for planning purposes, nothing else:
    /// speech durations are only known after synthesis.
    pub fn total_pause_sec(&self) -> u32 {
        self.segments().map(|s| s.pause_after_sec).sum()
    }

    pub fn title(&self) -> Option<&str> {
        self.metadata.as_ref().and_then(|m| m.title.as_deref())
    }

    pub fn description(&self) -> Option<&str> {
        self.metadata.as_ref().and_then(|m| m.description.as_deref())
    }

    /// Serialize back to pretty JSON for persistence in `raw_meta`.
    pub fn to_json_string(&self) -> String {
        let mut obj = serde_json::Map::new();
        if let Some(meta) = &self.metadata {
            if let Ok(v) = serde_json::to_value(meta) {
                obj.insert("metadata".to_string(), v);
            }
        }
        for (theme, segments) in &self.themes {
            if let Ok(v) = serde_json::to_value(segments) {
                obj.insert(theme.clone(), v);
            }
        }
        serde_json::to_string_pretty(&Value::Object(obj)).unwrap_or_default()
    }
}

/// Intermediate representation handed from the script phase to the audio phase.
#[derive(Debug, Clone, PartialEq)]
pub enum Script {
    /// A single block of prose, no internal segmentation.
    Flat(String),
    /// Themes of ordered segments plus generated metadata.
    Structured(StructuredScript),
}

impl Script {
    pub fn as_text(&self) -> String {
        match self {
            Script::Flat(text) => text.clone(),
            Script::Structured(s) => s.to_json_string(),
        }
    }
}
