//! End-to-end batch tests
//!
//! Writes the three source files to a temp directory, runs the batch against
//! a file-backed database and inspects what was persisted.

use easel_common::config::MaterialColumns;
use easel_common::db::init_database;
use easel_etl::batch::{extract, merge, run_batch, BatchSources};
use easel_etl::diagnostics::DiagnosticKind;
use easel_etl::EtlError;
use sqlx::SqlitePool;
use std::path::Path;
use tempfile::TempDir;

const DATES: &str = r#"
"A Walk in the Woods" (January 11, 1983)
"Mt. McKinley" (January 18, 1983)
"Ebony Sunset" (January 25, 1983)
"Orphan Date Only" (February 1, 1983)
Season 1 continued
"Winter Moon" (sometime)
"#;

const MATERIALS: &str = "painting_title,season,episode,colors\n\
\"A Walk in the Woods\",1,1,\"['Alizarin Crimson', 'Bright Red', 'Titanium White']\"\n\
Mt. McKinley,1,2,\"['Van Dyke Brown', 'Titanium White\\r\\n']\"\n\
Ebony Sunset,1,3,\"['Bright Red'\"\n\
Winter Moon,1,4,\"['Phthalo Blue']\"\n\
Quiet Stream,1,x,\"['Phthalo Blue']\"\n";

const TAGS: &str = "EPISODE,TITLE,MOUNTAIN,RIVER,SNOW,TREE\n\
S01E01,\"\"\"A WALK IN THE WOODS\"\"\",0,1,0,1\n\
S01E02,\"\"\"MOUNT MCKINLEY\"\"\",1,0,1,1\n\
S01E03,\"\"\"EBONY SUNSET\"\"\",0,0,0,1\n\
S01E99,\"\"\"NEVER PAINTED\"\"\",1,1,1,1\n";

fn write_sources(dir: &Path) -> BatchSources {
    let dates = dir.join("dates.txt");
    let materials = dir.join("materials.csv");
    let tags = dir.join("tags.csv");
    std::fs::write(&dates, DATES).unwrap();
    std::fs::write(&materials, MATERIALS).unwrap();
    std::fs::write(&tags, TAGS).unwrap();

    BatchSources {
        dates,
        materials,
        tags,
        material_columns: MaterialColumns::default(),
        tag_title_column: "TITLE".to_string(),
    }
}

async fn names_for(pool: &SqlitePool, title: &str, link_sql: &str) -> Vec<String> {
    sqlx::query_scalar(link_sql)
        .bind(title)
        .fetch_all(pool)
        .await
        .unwrap()
}

async fn count(pool: &SqlitePool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(pool)
        .await
        .unwrap()
}

const TAGS_OF: &str = "SELECT t.name FROM tags t
     JOIN episode_tags et ON et.tag_id = t.id
     JOIN episodes e ON e.id = et.episode_id
     WHERE e.title = ? ORDER BY t.name";

const MATERIALS_OF: &str = "SELECT m.name FROM materials m
     JOIN episode_materials em ON em.material_id = m.id
     JOIN episodes e ON e.id = em.episode_id
     WHERE e.title = ? ORDER BY m.name";

#[tokio::test]
async fn test_merge_output_includes_undated_episodes() {
    let dir = TempDir::new().unwrap();
    let sources = write_sources(dir.path());

    let (counts, outcome) = merge(extract(&sources).unwrap());

    assert_eq!(counts.material_records, 4, "Quiet Stream has a bad episode number");
    assert_eq!(counts.date_records, 5);
    assert_eq!(outcome.episodes.len(), 4);
    assert_eq!(outcome.dated_count(), 3, "Winter Moon has no parseable date");

    let winter_moon = outcome
        .episodes
        .iter()
        .find(|e| e.title.as_str() == "WINTER MOON")
        .unwrap();
    assert!(winter_moon.broadcast_date.is_none());
}

#[tokio::test]
async fn test_batch_persists_dated_episodes_with_links() {
    let dir = TempDir::new().unwrap();
    let sources = write_sources(dir.path());
    let pool = init_database(&dir.path().join("easel.db")).await.unwrap();

    let report = run_batch(&pool, &sources, false).await.unwrap();
    let load = report.load.clone().unwrap();

    assert_eq!(load.episodes_written, 3);
    assert_eq!(load.episodes_skipped_undated, 1);
    assert_eq!(count(&pool, "episodes").await, 3);

    assert_eq!(
        names_for(&pool, "MOUNT MCKINLEY", MATERIALS_OF).await,
        vec!["Titanium White", "Van Dyke Brown"]
    );
    assert_eq!(
        names_for(&pool, "MOUNT MCKINLEY", TAGS_OF).await,
        vec!["MOUNTAIN", "SNOW", "TREE"]
    );
    assert_eq!(
        names_for(&pool, "A WALK IN THE WOODS", TAGS_OF).await,
        vec!["RIVER", "TREE"]
    );

    // Winter Moon is undated, but its material still enters the vocabulary
    let phthalo: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM materials WHERE name = 'Phthalo Blue'")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(phthalo, 1);
}

#[tokio::test]
async fn test_malformed_rows_reported_not_fatal() {
    let dir = TempDir::new().unwrap();
    let sources = write_sources(dir.path());
    let pool = init_database(&dir.path().join("easel.db")).await.unwrap();

    let report = run_batch(&pool, &sources, false).await.unwrap();

    assert_eq!(report.count(DiagnosticKind::MalformedMaterials), 1);
    assert_eq!(report.count(DiagnosticKind::MalformedDate), 1);
    // "Season 1 continued" line and the Quiet Stream row
    assert_eq!(report.count(DiagnosticKind::MalformedRecord), 2);
    // Orphan date and orphan tag row
    assert_eq!(report.count(DiagnosticKind::OrphanRecord), 2);

    // Ebony Sunset kept despite its broken material list
    assert!(names_for(&pool, "EBONY SUNSET", MATERIALS_OF).await.is_empty());
    assert_eq!(names_for(&pool, "EBONY SUNSET", TAGS_OF).await, vec!["TREE"]);
}

#[tokio::test]
async fn test_rerun_creates_no_duplicates() {
    let dir = TempDir::new().unwrap();
    let sources = write_sources(dir.path());
    let pool = init_database(&dir.path().join("easel.db")).await.unwrap();

    run_batch(&pool, &sources, false).await.unwrap();
    let before = (
        count(&pool, "materials").await,
        count(&pool, "tags").await,
        count(&pool, "episode_materials").await,
        count(&pool, "episode_tags").await,
    );

    let second = run_batch(&pool, &sources, false).await.unwrap();
    let after = (
        count(&pool, "materials").await,
        count(&pool, "tags").await,
        count(&pool, "episode_materials").await,
        count(&pool, "episode_tags").await,
    );

    assert_eq!(before, after);
    assert_eq!(count(&pool, "episodes").await, 3);
    let load = second.load.unwrap();
    assert_eq!(load.materials_added, 0);
    assert_eq!(load.tags_added, 0);
}

#[tokio::test]
async fn test_dry_run_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let sources = write_sources(dir.path());
    let pool = init_database(&dir.path().join("easel.db")).await.unwrap();

    let report = run_batch(&pool, &sources, true).await.unwrap();

    assert!(report.load.is_none());
    assert_eq!(report.merged_episodes, 4);
    assert_eq!(count(&pool, "episodes").await, 0);
    assert_eq!(count(&pool, "materials").await, 0);
}

#[tokio::test]
async fn test_missing_required_column_aborts_before_load() {
    let dir = TempDir::new().unwrap();
    let mut sources = write_sources(dir.path());
    sources.tag_title_column = "PAINTING".to_string();
    let pool = init_database(&dir.path().join("easel.db")).await.unwrap();

    let result = run_batch(&pool, &sources, false).await;

    assert!(matches!(result, Err(EtlError::MissingColumn { .. })));
    assert_eq!(count(&pool, "episodes").await, 0);
}

#[tokio::test]
async fn test_missing_source_file_is_error() {
    let dir = TempDir::new().unwrap();
    let mut sources = write_sources(dir.path());
    sources.dates = dir.path().join("absent.txt");

    let result = extract(&sources);

    assert!(matches!(result, Err(EtlError::Source { .. })));
}

#[tokio::test]
async fn test_report_serializes_to_json() {
    let dir = TempDir::new().unwrap();
    let sources = write_sources(dir.path());
    let pool = init_database(&dir.path().join("easel.db")).await.unwrap();

    let report = run_batch(&pool, &sources, false).await.unwrap();
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["merged_episodes"], 4);
    assert_eq!(json["load"]["episodes_written"], 3);
    assert!(json["diagnostics"]
        .as_array()
        .unwrap()
        .iter()
        .any(|d| d["kind"] == "malformed_materials"));
}
