//! Episode table access.

use crate::db::EpisodeStore;
use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use podcraft_common::{ids, Episode, NewEpisode};
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, Row, Sqlite};
use tracing::{info, warn};

/// SQLite-backed episode store.
pub struct SqliteEpisodeStore {
    pool: Pool<Sqlite>,
}

impl SqliteEpisodeStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }
}

fn row_to_episode(row: &SqliteRow) -> Result<Episode> {
    let published_at: String = row.try_get("published_at")?;
    let published_at = DateTime::parse_from_rfc3339(&published_at)
        .map_err(|e| Error::Persist(format!("bad published_at in row: {e}")))?
        .with_timezone(&Utc);

    let raw_meta: String = row.try_get("raw_meta")?;
    let raw_meta = serde_json::from_str(&raw_meta).unwrap_or(serde_json::Value::Null);

    Ok(Episode {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        intent: row.try_get("intent")?,
        language: row.try_get("language")?,
        title: row.try_get("title")?,
        summary: row.try_get("summary")?,
        audio_path: row.try_get("audio_path")?,
        audio_url: row.try_get("audio_url")?,
        duration_sec: row.try_get("duration_sec")?,
        published_at,
        raw_meta,
    })
}

#[async_trait]
impl EpisodeStore for SqliteEpisodeStore {
    async fn insert(&self, episode: NewEpisode) -> Result<Episode> {
        let id = ids::generate().to_string();
        let raw_meta = serde_json::to_string(&episode.raw_meta)
            .map_err(|e| Error::Persist(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO episodes
                (id, user_id, intent, language, title, summary,
                 audio_path, audio_url, duration_sec, published_at, raw_meta)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&episode.user_id)
        .bind(episode.intent.as_str())
        .bind(&episode.language)
        .bind(&episode.title)
        .bind(&episode.summary)
        .bind(&episode.audio_path)
        .bind(&episode.audio_url)
        .bind(episode.duration_sec)
        .bind(episode.published_at.to_rfc3339())
        .bind(&raw_meta)
        .execute(&self.pool)
        .await?;

        info!(episode_id = %id, title = %episode.title, "episode persisted");

        Ok(Episode {
            id,
            user_id: episode.user_id,
            intent: episode.intent.as_str().to_string(),
            language: episode.language,
            title: episode.title,
            summary: episode.summary,
            audio_path: episode.audio_path,
            audio_url: episode.audio_url,
            duration_sec: episode.duration_sec,
            published_at: episode.published_at,
            raw_meta: episode.raw_meta,
        })
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Episode>> {
        let rows = sqlx::query(
            "SELECT * FROM episodes WHERE user_id = ? ORDER BY published_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut episodes = Vec::with_capacity(rows.len());
        for row in &rows {
            match row_to_episode(row) {
                Ok(ep) => episodes.push(ep),
                // A malformed row should not take the whole feed down
                Err(e) => warn!("skipping unreadable episode row: {e}"),
            }
        }
        Ok(episodes)
    }

    async fn count_for_user(&self, user_id: &str) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM episodes WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use podcraft_common::Intent;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_store() -> SqliteEpisodeStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        crate::db::init::init_schema(&pool).await.unwrap();
        SqliteEpisodeStore::new(pool)
    }

    fn new_episode(user: &str, title: &str, published_at: DateTime<Utc>) -> NewEpisode {
        NewEpisode {
            user_id: user.to_string(),
            intent: Intent::Briefing,
            language: "en".to_string(),
            title: title.to_string(),
            summary: "summary".to_string(),
            audio_path: format!("{user}/a.mp3"),
            audio_url: format!("https://cdn/{user}/a.mp3"),
            duration_sec: 120,
            published_at,
            raw_meta: serde_json::json!({"k": "v"}),
        }
    }

    #[tokio::test]
    async fn insert_assigns_id_and_round_trips() {
        let store = test_store().await;
        let at = Utc.with_ymd_and_hms(2025, 5, 1, 12, 0, 0).unwrap();

        let inserted = store.insert(new_episode("u1", "First", at)).await.unwrap();
        assert!(!inserted.id.is_empty());

        let listed = store.list_for_user("u1").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, inserted.id);
        assert_eq!(listed[0].title, "First");
        assert_eq!(listed[0].duration_sec, 120);
        assert_eq!(listed[0].published_at, at);
        assert_eq!(listed[0].raw_meta["k"], "v");
        assert_eq!(listed[0].intent, "briefing");
    }

    #[tokio::test]
    async fn list_is_newest_first_and_scoped_by_user() {
        let store = test_store().await;
        let older = Utc.with_ymd_and_hms(2025, 5, 1, 8, 0, 0).unwrap();
        let newer = Utc.with_ymd_and_hms(2025, 5, 2, 8, 0, 0).unwrap();

        store.insert(new_episode("u1", "Old", older)).await.unwrap();
        store.insert(new_episode("u1", "New", newer)).await.unwrap();
        store.insert(new_episode("u2", "Other", newer)).await.unwrap();

        let listed = store.list_for_user("u1").await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].title, "New");
        assert_eq!(listed[1].title, "Old");
    }

    #[tokio::test]
    async fn count_for_user() {
        let store = test_store().await;
        let at = Utc.with_ymd_and_hms(2025, 5, 1, 8, 0, 0).unwrap();

        assert_eq!(store.count_for_user("u1").await.unwrap(), 0);
        store.insert(new_episode("u1", "A", at)).await.unwrap();
        store.insert(new_episode("u1", "B", at)).await.unwrap();
        assert_eq!(store.count_for_user("u1").await.unwrap(), 2);
        assert_eq!(store.count_for_user("u2").await.unwrap(), 0);
    }
}
