//! Batch runner
//!
//! Extract -> reconcile -> load, producing a [`BatchReport`] that carries
//! every record-level diagnostic of the run.

use chrono::{DateTime, Utc};
use easel_common::config::{MaterialColumns, SourcesConfig};
use serde::Serialize;
use sqlx::SqlitePool;
use std::path::PathBuf;
use tracing::{error, info};
use uuid::Uuid;

use crate::diagnostics::{Diagnostic, DiagnosticKind, SourceKind};
use crate::error::EtlResult;
use crate::loader::{load_batch, LoadSummary};
use crate::reconcile::{MergeOutcome, MergeStats, Reconciler};
use crate::records::{DateRecord, MaterialRecord, TagRecord};
use crate::source::{read_lines, read_table, Table};

/// Input files and column layout for one batch
#[derive(Debug, Clone)]
pub struct BatchSources {
    pub dates: PathBuf,
    pub materials: PathBuf,
    pub tags: PathBuf,
    pub material_columns: MaterialColumns,
    pub tag_title_column: String,
}

impl From<&SourcesConfig> for BatchSources {
    fn from(config: &SourcesConfig) -> Self {
        Self {
            dates: config.dates_path(),
            materials: config.materials_path(),
            tags: config.tags_path(),
            material_columns: config.material_columns.clone(),
            tag_title_column: config.tag_title_column.clone(),
        }
    }
}

/// Typed records of all three sources plus boundary diagnostics
#[derive(Debug, Clone, Default)]
pub struct Extracted {
    pub dates: Vec<DateRecord>,
    pub materials: Vec<MaterialRecord>,
    pub tags: Vec<TagRecord>,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecordCounts {
    pub date_records: usize,
    pub material_records: usize,
    pub tag_records: usize,
    pub rejected_records: usize,
}

/// Summary of one batch run
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub records: RecordCounts,
    pub merged_episodes: usize,
    pub dated_episodes: usize,
    pub merge: MergeStats,
    /// None for a dry run
    pub load: Option<LoadSummary>,
    pub diagnostics: Vec<Diagnostic>,
}

impl BatchReport {
    pub fn warning_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.kind.is_warning())
            .count()
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        crate::diagnostics::count_kind(&self.diagnostics, kind)
    }
}

/// Read all three sources into typed records
///
/// Fails only when a whole source is unusable (missing file, unreadable
/// header, required column absent). Bad rows become diagnostics.
pub fn extract(sources: &BatchSources) -> EtlResult<Extracted> {
    let mut extracted = Extracted::default();

    for line in read_lines(&sources.dates)? {
        match DateRecord::parse_line(&line) {
            Some(Ok(record)) => extracted.dates.push(record),
            Some(Err(diagnostic)) => reject(&mut extracted.diagnostics, diagnostic),
            None => {}
        }
    }

    let materials = read_table(&sources.materials)?;
    let columns = &sources.material_columns;
    materials.require_columns(
        &sources.materials,
        [
            columns.title.as_str(),
            columns.season.as_str(),
            columns.episode.as_str(),
            columns.materials.as_str(),
        ],
    )?;
    report_unreadable(&mut extracted.diagnostics, SourceKind::Materials, &materials);
    for row in &materials.rows {
        match MaterialRecord::from_raw(row, columns) {
            Ok(record) => extracted.materials.push(record),
            Err(diagnostic) => reject(&mut extracted.diagnostics, diagnostic),
        }
    }

    let tags = read_table(&sources.tags)?;
    tags.require_columns(&sources.tags, [sources.tag_title_column.as_str()])?;
    report_unreadable(&mut extracted.diagnostics, SourceKind::Tags, &tags);
    for row in &tags.rows {
        match TagRecord::from_raw(row, &sources.tag_title_column) {
            Ok(record) => extracted.tags.push(record),
            Err(diagnostic) => reject(&mut extracted.diagnostics, diagnostic),
        }
    }

    info!(
        "Extracted {} date records, {} material records, {} tag records",
        extracted.dates.len(),
        extracted.materials.len(),
        extracted.tags.len()
    );

    Ok(extracted)
}

/// Merge extracted records
pub fn merge(extracted: Extracted) -> (RecordCounts, MergeOutcome) {
    let counts = RecordCounts {
        date_records: extracted.dates.len(),
        material_records: extracted.materials.len(),
        tag_records: extracted.tags.len(),
        rejected_records: extracted.diagnostics.len(),
    };

    let mut reconciler = Reconciler::new();
    reconciler.seed_materials(extracted.materials);
    reconciler.attach_dates(extracted.dates);
    reconciler.attach_tags(extracted.tags);

    let mut outcome = reconciler.finish();
    // Boundary rejections come first in the report
    let mut diagnostics = extracted.diagnostics;
    diagnostics.append(&mut outcome.diagnostics);
    outcome.diagnostics = diagnostics;

    (counts, outcome)
}

/// Run a full batch: extract, reconcile, and (unless `dry_run`) load
pub async fn run_batch(
    pool: &SqlitePool,
    sources: &BatchSources,
    dry_run: bool,
) -> EtlResult<BatchReport> {
    let run_id = Uuid::new_v4();
    let started_at = Utc::now();
    info!(run_id = %run_id, "Starting batch");

    let extracted = extract(sources)?;
    let (records, outcome) = merge(extracted);

    let load = if dry_run {
        info!("Dry run - skipping load");
        None
    } else {
        match load_batch(pool, &outcome.episodes).await {
            Ok(summary) => Some(summary),
            Err(e) => {
                error!(run_id = %run_id, "Load failed, batch rolled back: {}", e);
                return Err(e);
            }
        }
    };

    let report = BatchReport {
        run_id,
        started_at,
        finished_at: Utc::now(),
        records,
        merged_episodes: outcome.episodes.len(),
        dated_episodes: outcome.dated_count(),
        merge: outcome.stats,
        load,
        diagnostics: outcome.diagnostics,
    };

    info!(
        run_id = %run_id,
        merged = report.merged_episodes,
        dated = report.dated_episodes,
        warnings = report.warning_count(),
        "Batch complete"
    );

    Ok(report)
}

fn reject(diagnostics: &mut Vec<Diagnostic>, diagnostic: Diagnostic) {
    diagnostic.log();
    diagnostics.push(diagnostic);
}

fn report_unreadable(diagnostics: &mut Vec<Diagnostic>, source: SourceKind, table: &Table) {
    for (row_number, message) in &table.unreadable {
        reject(
            diagnostics,
            Diagnostic::new(
                DiagnosticKind::MalformedRecord,
                source,
                None,
                format!("row {}: {}", row_number, message),
            ),
        );
    }
}
