//! Episode queries
//!
//! A [`QueryPlan`] renders to one id query: each predicate becomes a
//! `SELECT episode_id` sub-query, joined with `INTERSECT` or `UNION`, under
//! `WHERE e.id IN (...)`. Matching episodes are then hydrated with one link
//! query per vocabulary.

use easel_common::{Result, VocabularyKind};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

use crate::filter::{QueryPlan, SubPredicate};
use crate::model::EpisodeView;

const EPISODE_COLUMNS: &str =
    "SELECT e.id, e.title, e.season, e.episode_number, e.broadcast_date FROM episodes e";

const EPISODE_ORDER: &str = " ORDER BY e.season, e.episode_number, e.id";

/// Run a plan against the catalog
pub async fn find_episodes(pool: &SqlitePool, plan: &QueryPlan) -> Result<Vec<EpisodeView>> {
    if plan.is_empty() {
        return Ok(Vec::new());
    }

    let mut builder = QueryBuilder::<Sqlite>::new(EPISODE_COLUMNS);
    builder.push(" WHERE e.id IN (");
    for (i, predicate) in plan.predicates.iter().enumerate() {
        if i > 0 {
            builder.push(" ");
            builder.push(plan.combinator.sql_keyword());
            builder.push(" ");
        }
        push_predicate(&mut builder, predicate);
    }
    builder.push(")");
    builder.push(EPISODE_ORDER);

    debug!(sql = builder.sql(), "Running episode filter");

    let rows = builder.build().fetch_all(pool).await?;
    hydrate(pool, rows).await
}

/// Every persisted episode, in result order
#[cfg(test)]
pub async fn list_episodes(pool: &SqlitePool) -> Result<Vec<EpisodeView>> {
    let sql = format!("{}{}", EPISODE_COLUMNS, EPISODE_ORDER);
    let rows = sqlx::query(&sql).fetch_all(pool).await?;
    hydrate(pool, rows).await
}

fn push_predicate(builder: &mut QueryBuilder<'_, Sqlite>, predicate: &SubPredicate) {
    match predicate {
        SubPredicate::MonthIn(months) => {
            builder.push(
                "SELECT id FROM episodes \
                 WHERE CAST(strftime('%m', broadcast_date) AS INTEGER) IN (",
            );
            let mut values = builder.separated(", ");
            for month in months {
                values.push_bind(i64::from(*month));
            }
            values.push_unseparated(")");
        }
        SubPredicate::LinkedAll { kind, names } => {
            push_linked(builder, *kind, names);
            builder.push(" GROUP BY l.episode_id HAVING COUNT(DISTINCT v.name) = ");
            builder.push_bind(names.len() as i64);
        }
        SubPredicate::LinkedAny { kind, names } => {
            push_linked(builder, *kind, names);
        }
    }
}

/// `SELECT l.episode_id` for episodes linked to any of `names`
fn push_linked(builder: &mut QueryBuilder<'_, Sqlite>, kind: VocabularyKind, names: &BTreeSet<String>) {
    builder.push(format!(
        "SELECT l.episode_id FROM {} l JOIN {} v ON v.id = l.{} WHERE v.name IN (",
        kind.link_table(),
        kind.table(),
        kind.link_column()
    ));
    let mut values = builder.separated(", ");
    for name in names {
        values.push_bind(name.clone());
    }
    values.push_unseparated(")");
}

async fn hydrate(pool: &SqlitePool, rows: Vec<SqliteRow>) -> Result<Vec<EpisodeView>> {
    let mut episodes = rows
        .iter()
        .map(|row| {
            Ok(EpisodeView {
                id: row.try_get("id")?,
                title: row.try_get("title")?,
                season: row.try_get("season")?,
                episode_number: row.try_get("episode_number")?,
                broadcast_date: row.try_get("broadcast_date")?,
                materials: Vec::new(),
                tags: Vec::new(),
            })
        })
        .collect::<std::result::Result<Vec<_>, sqlx::Error>>()?;

    if episodes.is_empty() {
        return Ok(episodes);
    }

    let ids: Vec<i64> = episodes.iter().map(|e| e.id).collect();
    let mut materials = linked_names(pool, VocabularyKind::Material, &ids).await?;
    let mut tags = linked_names(pool, VocabularyKind::Tag, &ids).await?;

    for episode in &mut episodes {
        episode.materials = materials.remove(&episode.id).unwrap_or_default();
        episode.tags = tags.remove(&episode.id).unwrap_or_default();
    }

    Ok(episodes)
}

/// `episode_id -> sorted names` for the given episodes
async fn linked_names(
    pool: &SqlitePool,
    kind: VocabularyKind,
    ids: &[i64],
) -> Result<HashMap<i64, Vec<String>>> {
    let mut builder = QueryBuilder::<Sqlite>::new(format!(
        "SELECT l.episode_id, v.name FROM {} l JOIN {} v ON v.id = l.{} WHERE l.episode_id IN (",
        kind.link_table(),
        kind.table(),
        kind.link_column()
    ));
    let mut values = builder.separated(", ");
    for id in ids {
        values.push_bind(*id);
    }
    values.push_unseparated(") ORDER BY l.episode_id, v.name");

    let rows = builder.build().fetch_all(pool).await?;

    let mut names: HashMap<i64, Vec<String>> = HashMap::new();
    for row in rows {
        let episode_id: i64 = row.try_get("episode_id")?;
        let name: String = row.try_get("name")?;
        names.entry(episode_id).or_default().push(name);
    }

    Ok(names)
}
