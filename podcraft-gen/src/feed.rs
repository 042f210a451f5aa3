//! Feed regeneration trigger.
//!
//! Feed (XML) assembly itself lives outside this engine; the pipeline only
//! triggers a rebuild after every persisted episode and uploads the result.
//! The builder is consumed through this trait.

use crate::config::FeedConfig;
use crate::error::Result;
use podcraft_common::Episode;

/// Channel-level metadata handed to the feed builder, resolved per user.
#[derive(Debug, Clone)]
pub struct ChannelMeta {
    pub title: String,
    pub description: String,
    pub author: String,
    pub category: String,
    pub language: String,
    pub cover_url: String,
    pub site_url: String,
    pub ttl_minutes: u32,
}

impl ChannelMeta {
    /// Resolve the configured templates for one user.
    pub fn for_user(config: &FeedConfig, user_id: &str) -> Self {
        ChannelMeta {
            title: config.title_template.replace("{user_id}", user_id),
            description: config.description_template.replace("{user_id}", user_id),
            author: config.author.clone(),
            category: config.category.clone(),
            language: config.language.clone(),
            cover_url: config.cover_url.clone(),
            site_url: config.site_url.clone(),
            ttl_minutes: config.ttl_minutes,
        }
    }
}

/// Feed document builder collaborator.
pub trait FeedBuilder: Send + Sync {
    /// Build the feed document for a user from the full episode list
    /// (newest first).
    fn build(&self, user_id: &str, episodes: &[Episode], channel: &ChannelMeta)
        -> Result<Vec<u8>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_meta_fills_user_templates() {
        let config = FeedConfig::default();
        let meta = ChannelMeta::for_user(&config, "user-9");
        assert!(meta.title.contains("user-9"));
        assert!(meta.description.contains("user-9"));
        assert!(!meta.title.contains("{user_id}"));
    }
}
