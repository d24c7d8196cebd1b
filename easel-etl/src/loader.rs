//! Batch loader
//!
//! Persists a merge result in a single transaction:
//! 1. Upsert every material and tag name (vocabularies only grow)
//! 2. Read back `name -> id` maps
//! 3. Clear episodes and links (episodes are rebuilt wholesale each run)
//! 4. Insert dated episodes and link them to their vocabulary ids
//!
//! Any storage error drops the transaction, which rolls back every write of
//! the batch; the previously committed catalog stays intact.

use chrono::NaiveDate;
use easel_common::db::{list_vocabulary, upsert_vocabulary};
use easel_common::{Episode, VocabularyKind};
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

use crate::error::EtlResult;

/// Counters for one load
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    pub materials_added: usize,
    pub tags_added: usize,
    pub episodes_written: usize,
    pub episodes_skipped_undated: usize,
    pub material_links: usize,
    pub tag_links: usize,
}

/// Fields required to store an episode
#[derive(Debug, Clone, Copy)]
pub struct EpisodeRow<'a> {
    pub title: &'a str,
    pub season: u32,
    pub episode_number: u32,
    pub broadcast_date: NaiveDate,
}

impl<'a> EpisodeRow<'a> {
    /// None for undated episodes, which are never stored
    pub fn from_episode(episode: &'a Episode) -> Option<Self> {
        episode.broadcast_date.map(|broadcast_date| Self {
            title: episode.title.as_str(),
            season: episode.season,
            episode_number: episode.episode_number,
            broadcast_date,
        })
    }
}

/// Persist a merge result atomically
pub async fn load_batch(pool: &SqlitePool, episodes: &[Episode]) -> EtlResult<LoadSummary> {
    let mut summary = LoadSummary::default();

    // Vocabularies cover every merged episode, dated or not
    let materials: BTreeSet<&str> = episodes
        .iter()
        .flat_map(|e| e.materials.iter().map(String::as_str))
        .collect();
    let tags: BTreeSet<&str> = episodes
        .iter()
        .flat_map(|e| e.tags.iter().map(String::as_str))
        .collect();

    let mut tx = pool.begin().await?;

    for name in &materials {
        if upsert_vocabulary(&mut *tx, VocabularyKind::Material, name).await? {
            summary.materials_added += 1;
        }
    }
    for name in &tags {
        if upsert_vocabulary(&mut *tx, VocabularyKind::Tag, name).await? {
            summary.tags_added += 1;
        }
    }
    debug!(
        materials = materials.len(),
        tags = tags.len(),
        "Vocabularies upserted"
    );

    let material_ids = list_vocabulary(&mut *tx, VocabularyKind::Material).await?;
    let tag_ids = list_vocabulary(&mut *tx, VocabularyKind::Tag).await?;

    clear_episodes(&mut *tx).await?;

    for episode in episodes {
        let Some(row) = EpisodeRow::from_episode(episode) else {
            summary.episodes_skipped_undated += 1;
            continue;
        };

        let episode_id = insert_episode(&mut *tx, &row).await?;
        summary.episodes_written += 1;

        summary.material_links += link_names(
            &mut *tx,
            episode_id,
            VocabularyKind::Material,
            &episode.materials,
            &material_ids,
        )
        .await?;
        summary.tag_links +=
            link_names(&mut *tx, episode_id, VocabularyKind::Tag, &episode.tags, &tag_ids).await?;
    }

    tx.commit().await?;

    info!(
        written = summary.episodes_written,
        skipped_undated = summary.episodes_skipped_undated,
        materials_added = summary.materials_added,
        tags_added = summary.tags_added,
        "Batch committed"
    );

    Ok(summary)
}

/// Remove all episodes and their links
pub async fn clear_episodes(conn: &mut SqliteConnection) -> EtlResult<()> {
    for kind in VocabularyKind::ALL {
        sqlx::query(clear_links_sql(kind)).execute(&mut *conn).await?;
    }
    sqlx::query("DELETE FROM episodes").execute(&mut *conn).await?;
    Ok(())
}

/// Insert one episode and return its id
pub async fn insert_episode(conn: &mut SqliteConnection, row: &EpisodeRow<'_>) -> EtlResult<i64> {
    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO episodes (title, season, episode_number, broadcast_date)
        VALUES (?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(row.title)
    .bind(i64::from(row.season))
    .bind(i64::from(row.episode_number))
    .bind(row.broadcast_date)
    .fetch_one(&mut *conn)
    .await?;

    Ok(id)
}

/// Link an episode to a vocabulary id; returns false if the link existed
pub async fn link_episode(
    conn: &mut SqliteConnection,
    episode_id: i64,
    vocabulary_id: i64,
    kind: VocabularyKind,
) -> EtlResult<bool> {
    let result = sqlx::query(link_sql(kind))
        .bind(episode_id)
        .bind(vocabulary_id)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected() > 0)
}

async fn link_names(
    conn: &mut SqliteConnection,
    episode_id: i64,
    kind: VocabularyKind,
    names: &BTreeSet<String>,
    ids: &BTreeMap<String, i64>,
) -> EtlResult<usize> {
    let mut linked = 0;
    for name in names {
        // Every name was upserted above
        let Some(&vocabulary_id) = ids.get(name) else {
            debug!(kind = %kind, name = %name, "Name missing from vocabulary, not linked");
            continue;
        };
        if link_episode(conn, episode_id, vocabulary_id, kind).await? {
            linked += 1;
        }
    }
    Ok(linked)
}

fn link_sql(kind: VocabularyKind) -> &'static str {
    match kind {
        VocabularyKind::Material => {
            "INSERT INTO episode_materials (episode_id, material_id) VALUES (?, ?) ON CONFLICT DO NOTHING"
        }
        VocabularyKind::Tag => {
            "INSERT INTO episode_tags (episode_id, tag_id) VALUES (?, ?) ON CONFLICT DO NOTHING"
        }
    }
}

fn clear_links_sql(kind: VocabularyKind) -> &'static str {
    match kind {
        VocabularyKind::Material => "DELETE FROM episode_materials",
        VocabularyKind::Tag => "DELETE FROM episode_tags",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use easel_common::db::open_in_memory;
    use easel_common::NormalizedTitle;

    fn episode(title: &str, season: u32, number: u32, date: Option<(i32, u32, u32)>) -> Episode {
        let mut e = Episode::new(
            NormalizedTitle::new(title),
            season,
            number,
            vec!["Bright Red".to_string(), "Titanium White".to_string()],
        );
        e.broadcast_date = date.map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).unwrap());
        e.tags.insert("TREE".to_string());
        e
    }

    async fn count(pool: &SqlitePool, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_undated_episodes_not_persisted() {
        let pool = open_in_memory().await.unwrap();
        let episodes = vec![
            episode("Winter Mist", 1, 1, Some((1983, 1, 11))),
            episode("Quiet Stream", 1, 2, None),
        ];

        let summary = load_batch(&pool, &episodes).await.unwrap();

        assert_eq!(summary.episodes_written, 1);
        assert_eq!(summary.episodes_skipped_undated, 1);
        assert_eq!(count(&pool, "episodes").await, 1);
        assert_eq!(summary.material_links, 2);
        assert_eq!(summary.tag_links, 1);
    }

    #[tokio::test]
    async fn test_broadcast_date_stored_as_iso_text() {
        let pool = open_in_memory().await.unwrap();
        load_batch(&pool, &[episode("Winter Mist", 1, 1, Some((1983, 1, 11)))])
            .await
            .unwrap();

        let stored: String = sqlx::query_scalar("SELECT broadcast_date FROM episodes")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(stored, "1983-01-11");
    }

    #[tokio::test]
    async fn test_reload_is_idempotent() {
        let pool = open_in_memory().await.unwrap();
        let episodes = vec![
            episode("Winter Mist", 1, 1, Some((1983, 1, 11))),
            episode("Quiet Stream", 1, 2, Some((1983, 1, 18))),
        ];

        load_batch(&pool, &episodes).await.unwrap();
        let second = load_batch(&pool, &episodes).await.unwrap();

        assert_eq!(second.materials_added, 0);
        assert_eq!(second.tags_added, 0);
        assert_eq!(count(&pool, "materials").await, 2);
        assert_eq!(count(&pool, "tags").await, 1);
        assert_eq!(count(&pool, "episodes").await, 2);
        assert_eq!(count(&pool, "episode_materials").await, 4);
        assert_eq!(count(&pool, "episode_tags").await, 2);
    }

    #[tokio::test]
    async fn test_link_episode_ignores_duplicates() {
        let pool = open_in_memory().await.unwrap();
        load_batch(&pool, &[episode("Winter Mist", 1, 1, Some((1983, 1, 11)))])
            .await
            .unwrap();

        let episode_id: i64 = sqlx::query_scalar("SELECT id FROM episodes")
            .fetch_one(&pool)
            .await
            .unwrap();
        let tag_id: i64 = sqlx::query_scalar("SELECT id FROM tags WHERE name = 'TREE'")
            .fetch_one(&pool)
            .await
            .unwrap();

        let mut conn = pool.acquire().await.unwrap();
        let created = link_episode(&mut conn, episode_id, tag_id, VocabularyKind::Tag)
            .await
            .unwrap();

        assert!(!created);
    }

    #[tokio::test]
    async fn test_storage_failure_rolls_back_whole_batch() {
        let pool = open_in_memory().await.unwrap();
        load_batch(&pool, &[episode("Winter Mist", 1, 1, Some((1983, 1, 11)))])
            .await
            .unwrap();

        sqlx::query(
            r#"
            CREATE TRIGGER reject_boom BEFORE INSERT ON episodes
            WHEN NEW.title = 'BOOM'
            BEGIN SELECT RAISE(ABORT, 'rejected'); END
            "#,
        )
        .execute(&pool)
        .await
        .unwrap();

        let mut failing = vec![episode("Quiet Stream", 1, 2, Some((1983, 1, 18)))];
        failing[0].materials.insert("Phthalo Blue".to_string());
        failing.push(episode("Boom", 1, 3, Some((1983, 1, 25))));

        let result = load_batch(&pool, &failing).await;
        assert!(result.is_err());

        // Previous batch intact, nothing from the failed one
        let titles: Vec<String> = sqlx::query_scalar("SELECT title FROM episodes")
            .fetch_all(&pool)
            .await
            .unwrap();
        assert_eq!(titles, vec!["WINTER MIST".to_string()]);
        assert_eq!(count(&pool, "materials").await, 2);
        assert_eq!(count(&pool, "episode_materials").await, 2);
    }
}
