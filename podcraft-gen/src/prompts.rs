//! Built-in prompt templates.
//!
//! System prompts per intent plus text-to-speech style hints. Templates use
//! `{duration_sec}` / `{lang}` placeholders filled at request time.

const BRIEFING_SYSTEM: &str = "\
You write spoken-word briefing scripts for a personal podcast. \
Write a single continuous block of prose, no headings, no stage directions, \
no speaker labels. Informative and engaging tone. Target length: about \
{duration_sec} seconds when read aloud. Respond in language: {lang}.";

const WELLNESS_SYSTEM: &str = "\
You write guided wellness sessions as JSON. Respond with a single JSON \
object. Each top-level key except \"metadata\" is a theme slug mapping to an \
array of segments; a segment is {\"category\": string, \"text\": string, \
\"pause_after_sec\": integer}. Use empty text with a pause for pure silence. \
Include a \"metadata\" key with {\"title\": string, \"description\": string}. \
Calm, slow pacing with generous pauses. Target total length including pauses: \
about {duration_sec} seconds. Respond in language: {lang}.";

const DIALOGUE_SYSTEM: &str = "\
You write a two-host conversational podcast as JSON. Respond with a single \
JSON object containing \"metadata\" ({\"title\": string, \"description\": \
string}) and \"slug_theme\": an array of segments {\"speaker\": \"speaker_1\" \
or \"speaker_2\", \"text\": string, \"pause_after_sec\": integer}. Hosts \
alternate naturally, with curiosity and nuance. Target length: about \
{duration_sec} seconds. Respond in language: {lang}.";

/// Calm read for wellness sessions.
pub const WELLNESS_STYLE_HINT: &str =
    "Speak slowly and softly, with a calm, even tone and unhurried pacing.";

/// Dialogue host voices keep distinct personalities.
pub const DIALOGUE_SPEAKER_1_HINT: &str =
    "Warm, curious host. Conversational pacing, genuine interest.";
pub const DIALOGUE_SPEAKER_2_HINT: &str =
    "Thoughtful co-host. Measured delivery, dry wit.";

fn fill(template: &str, duration_sec: u32, lang: &str) -> String {
    template
        .replace("{duration_sec}", &duration_sec.to_string())
        .replace("{lang}", lang)
}

pub fn briefing_system_prompt(duration_sec: u32, lang: &str) -> String {
    fill(BRIEFING_SYSTEM, duration_sec, lang)
}

pub fn wellness_system_prompt(duration_sec: u32, lang: &str) -> String {
    fill(WELLNESS_SYSTEM, duration_sec, lang)
}

pub fn dialogue_system_prompt(duration_sec: u32, lang: &str) -> String {
    fill(DIALOGUE_SYSTEM, duration_sec, lang)
}

/// User-side context block shared by all intents.
pub fn user_context(message: &str, title: &str, summary: &str, duration_sec: u32) -> String {
    format!(
        "User message: {message}\n\nMetadata:\n- Title: {title}\n- Summary: {summary}\n- Target duration: {duration_sec} seconds\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_are_filled() {
        let prompt = briefing_system_prompt(180, "en");
        assert!(prompt.contains("180 seconds"));
        assert!(prompt.contains("language: en"));
        assert!(!prompt.contains("{duration_sec}"));
        assert!(!prompt.contains("{lang}"));
    }

    #[test]
    fn wellness_prompt_demands_json_shape() {
        let prompt = wellness_system_prompt(600, "fr");
        assert!(prompt.contains("pause_after_sec"));
        assert!(prompt.contains("metadata"));
    }

    #[test]
    fn dialogue_prompt_names_both_speakers() {
        let prompt = dialogue_system_prompt(240, "en");
        assert!(prompt.contains("speaker_1"));
        assert!(prompt.contains("speaker_2"));
        assert!(prompt.contains("slug_theme"));
    }

    #[test]
    fn user_context_carries_request_fields() {
        let ctx = user_context("tell me about tides", "Tides", "About tides", 240);
        assert!(ctx.contains("tell me about tides"));
        assert!(ctx.contains("Tides"));
        assert!(ctx.contains("240 seconds"));
    }
}
