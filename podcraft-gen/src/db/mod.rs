//! Episode metadata store.
//!
//! The engine writes exactly one row per successful generation and reads
//! the per-user list back for feed regeneration. Consumed through a trait
//! so pipeline tests run against an in-memory fake.

pub mod episodes;
pub mod init;

pub use episodes::SqliteEpisodeStore;

use crate::error::Result;
use async_trait::async_trait;
use podcraft_common::{Episode, NewEpisode};

/// Metadata store collaborator.
#[async_trait]
pub trait EpisodeStore: Send + Sync {
    /// Insert a new episode; the store assigns and returns the id.
    async fn insert(&self, episode: NewEpisode) -> Result<Episode>;

    /// All episodes for a user, newest first.
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Episode>>;

    /// Number of episodes for a user.
    async fn count_for_user(&self, user_id: &str) -> Result<i64>;
}
