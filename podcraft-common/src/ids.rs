//! Identifier and storage-path helpers.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Generate a new UUIDv4.
pub fn generate() -> Uuid {
    Uuid::new_v4()
}

/// Short collision-resistant suffix for storage paths (8 hex chars).
pub fn short_id() -> String {
    let id = Uuid::new_v4().simple().to_string();
    id[..8].to_string()
}

/// Non-guessable audio object path: `{user}/{yyyymmdd-HHMMSS}-{suffix}.{ext}`.
pub fn make_audio_path(user_id: &str, at: DateTime<Utc>, ext: &str) -> String {
    format!(
        "{}/{}-{}.{}",
        user_id,
        at.format("%Y%m%d-%H%M%S"),
        short_id(),
        ext
    )
}

/// Feed object path for a user.
pub fn make_feed_path(user_id: &str) -> String {
    format!("{}/feed.xml", user_id)
}
