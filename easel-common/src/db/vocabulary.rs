//! Material and tag vocabulary queries
//!
//! Vocabularies are additive: names are upserted, never deleted, and each
//! name keeps the id it was first given.

use crate::model::VocabularyKind;
use crate::Result;
use sqlx::{Executor, Sqlite};
use std::collections::BTreeMap;

fn upsert_sql(kind: VocabularyKind) -> &'static str {
    match kind {
        VocabularyKind::Material => "INSERT INTO materials (name) VALUES (?) ON CONFLICT(name) DO NOTHING",
        VocabularyKind::Tag => "INSERT INTO tags (name) VALUES (?) ON CONFLICT(name) DO NOTHING",
    }
}

fn list_sql(kind: VocabularyKind) -> &'static str {
    match kind {
        VocabularyKind::Material => "SELECT name, id FROM materials ORDER BY name",
        VocabularyKind::Tag => "SELECT name, id FROM tags ORDER BY name",
    }
}

/// Insert a vocabulary name if absent
///
/// Returns true when a new row was created.
pub async fn upsert_vocabulary<'e, E>(executor: E, kind: VocabularyKind, name: &str) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(upsert_sql(kind))
        .bind(name)
        .execute(executor)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Load `name -> id` for a vocabulary
pub async fn list_vocabulary<'e, E>(executor: E, kind: VocabularyKind) -> Result<BTreeMap<String, i64>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows: Vec<(String, i64)> = sqlx::query_as(list_sql(kind))
        .fetch_all(executor)
        .await?;

    Ok(rows.into_iter().collect())
}

/// Sorted vocabulary names
pub async fn list_vocabulary_names<'e, E>(executor: E, kind: VocabularyKind) -> Result<Vec<String>>
where
    E: Executor<'e, Database = Sqlite>,
{
    // BTreeMap keys are already in name order
    Ok(list_vocabulary(executor, kind).await?.into_keys().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;

    #[tokio::test]
    async fn test_upsert_is_idempotent() {
        let pool = open_in_memory().await.expect("in-memory database");

        assert!(upsert_vocabulary(&pool, VocabularyKind::Material, "Van Dyke Brown")
            .await
            .unwrap());
        assert!(!upsert_vocabulary(&pool, VocabularyKind::Material, "Van Dyke Brown")
            .await
            .unwrap());

        let materials = list_vocabulary(&pool, VocabularyKind::Material).await.unwrap();
        assert_eq!(materials.len(), 1);
        assert!(materials.contains_key("Van Dyke Brown"));
    }

    #[tokio::test]
    async fn test_vocabularies_are_independent() {
        let pool = open_in_memory().await.expect("in-memory database");

        upsert_vocabulary(&pool, VocabularyKind::Tag, "TREE").await.unwrap();
        upsert_vocabulary(&pool, VocabularyKind::Tag, "BARN").await.unwrap();
        upsert_vocabulary(&pool, VocabularyKind::Material, "Bright Red").await.unwrap();

        let tags = list_vocabulary_names(&pool, VocabularyKind::Tag).await.unwrap();
        assert_eq!(tags, vec!["BARN".to_string(), "TREE".to_string()]);

        let materials = list_vocabulary_names(&pool, VocabularyKind::Material).await.unwrap();
        assert_eq!(materials, vec!["Bright Red".to_string()]);
    }

    #[tokio::test]
    async fn test_existing_ids_are_stable() {
        let pool = open_in_memory().await.expect("in-memory database");

        upsert_vocabulary(&pool, VocabularyKind::Tag, "CLOUDS").await.unwrap();
        let before = list_vocabulary(&pool, VocabularyKind::Tag).await.unwrap()["CLOUDS"];

        upsert_vocabulary(&pool, VocabularyKind::Tag, "BEACH").await.unwrap();
        upsert_vocabulary(&pool, VocabularyKind::Tag, "CLOUDS").await.unwrap();
        let after = list_vocabulary(&pool, VocabularyKind::Tag).await.unwrap()["CLOUDS"];

        assert_eq!(before, after);
    }
}
