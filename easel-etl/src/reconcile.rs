//! Reconciliation engine
//!
//! Merges the three typed record streams into episodes keyed by
//! [`NormalizedTitle`].
//!
//! **Algorithm:**
//! 1. Material records seed episodes (season, episode number, materials).
//!    Only material records create episodes.
//! 2. Date records attach a broadcast date to an existing episode.
//! 3. Tag records add every set flag column to an existing episode's tags.
//! 4. Output keeps material first-seen order.
//!
//! Dates and tags for unknown titles are dropped as orphans. Dates and tags
//! write disjoint fields, so steps 2 and 3 may run in either order.
//! Date-less episodes stay in the output; the loader decides what persists.

use chrono::NaiveDate;
use easel_common::{Episode, NormalizedTitle};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info};

use crate::diagnostics::{Diagnostic, DiagnosticKind, SourceKind};
use crate::records::{DateRecord, MaterialRecord, TagRecord};

/// Date formats accepted for broadcast dates, tried in order
const DATE_FORMATS: &[&str] = &["%B %d, %Y", "%b %d, %Y", "%B %d %Y", "%Y-%m-%d", "%m/%d/%Y"];

/// Counters for one merge
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeStats {
    pub episodes_seeded: usize,
    pub duplicate_titles: usize,
    pub malformed_materials: usize,
    pub dates_attached: usize,
    pub malformed_dates: usize,
    pub orphan_dates: usize,
    pub tag_records_attached: usize,
    pub orphan_tag_records: usize,
}

/// Result of a merge
#[derive(Debug, Clone, Default)]
pub struct MergeOutcome {
    /// Episodes in material first-seen order, dated or not
    pub episodes: Vec<Episode>,
    pub diagnostics: Vec<Diagnostic>,
    pub stats: MergeStats,
}

impl MergeOutcome {
    pub fn dated_count(&self) -> usize {
        self.episodes.iter().filter(|e| e.is_persistable()).count()
    }
}

/// Incremental merge state
///
/// Call [`Reconciler::seed_materials`] first; dates and tags only decorate
/// episodes that already exist.
#[derive(Debug, Default)]
pub struct Reconciler {
    episodes: Vec<Episode>,
    index: HashMap<NormalizedTitle, usize>,
    diagnostics: Vec<Diagnostic>,
    stats: MergeStats,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed episodes from material records
    ///
    /// A repeated title replaces the earlier episode in place.
    pub fn seed_materials(&mut self, records: impl IntoIterator<Item = MaterialRecord>) {
        for record in records {
            let title = NormalizedTitle::new(&record.raw_title);

            let materials = match parse_material_list(&record.materials_field) {
                Ok(list) => list,
                Err(e) => {
                    debug!(title = %title, error = %e, "Could not parse material list");
                    self.stats.malformed_materials += 1;
                    self.raise(Diagnostic::new(
                        DiagnosticKind::MalformedMaterials,
                        SourceKind::Materials,
                        Some(title.to_string()),
                        record.materials_field.clone(),
                    ));
                    Vec::new()
                }
            };

            let episode = Episode::new(
                title.clone(),
                record.season,
                record.episode_number,
                materials,
            );

            match self.index.get(&title) {
                Some(&slot) => {
                    self.stats.duplicate_titles += 1;
                    self.raise(Diagnostic::new(
                        DiagnosticKind::DuplicateTitle,
                        SourceKind::Materials,
                        Some(title.to_string()),
                        record.raw_title.clone(),
                    ));
                    self.episodes[slot] = episode;
                }
                None => {
                    self.index.insert(title, self.episodes.len());
                    self.episodes.push(episode);
                    self.stats.episodes_seeded += 1;
                }
            }
        }
    }

    /// Attach broadcast dates (last writer wins)
    pub fn attach_dates(&mut self, records: impl IntoIterator<Item = DateRecord>) {
        for record in records {
            let title = NormalizedTitle::new(&record.raw_title);

            // Orphans are dropped whatever their date text looks like
            let Some(&slot) = self.index.get(&title) else {
                self.stats.orphan_dates += 1;
                self.raise(Diagnostic::new(
                    DiagnosticKind::OrphanRecord,
                    SourceKind::Dates,
                    Some(title.to_string()),
                    record.raw_date,
                ));
                continue;
            };

            match parse_broadcast_date(&record.raw_date) {
                Some(date) => {
                    self.episodes[slot].broadcast_date = Some(date);
                    self.stats.dates_attached += 1;
                }
                None => {
                    self.stats.malformed_dates += 1;
                    self.raise(Diagnostic::new(
                        DiagnosticKind::MalformedDate,
                        SourceKind::Dates,
                        Some(title.to_string()),
                        record.raw_date,
                    ));
                }
            }
        }
    }

    /// Add set flag columns to episode tag sets
    pub fn attach_tags(&mut self, records: impl IntoIterator<Item = TagRecord>) {
        for record in records {
            let title = NormalizedTitle::new(&record.raw_title);

            match self.index.get(&title) {
                Some(&slot) => {
                    let tags = &mut self.episodes[slot].tags;
                    tags.extend(record.set_flags().map(str::to_string));
                    self.stats.tag_records_attached += 1;
                }
                None => {
                    self.stats.orphan_tag_records += 1;
                    self.raise(Diagnostic::new(
                        DiagnosticKind::OrphanRecord,
                        SourceKind::Tags,
                        Some(title.to_string()),
                        record.raw_title,
                    ));
                }
            }
        }
    }

    pub fn finish(self) -> MergeOutcome {
        info!(
            episodes = self.episodes.len(),
            dated = self.episodes.iter().filter(|e| e.is_persistable()).count(),
            diagnostics = self.diagnostics.len(),
            "Merge complete"
        );

        MergeOutcome {
            episodes: self.episodes,
            diagnostics: self.diagnostics,
            stats: self.stats,
        }
    }

    fn raise(&mut self, diagnostic: Diagnostic) {
        diagnostic.log();
        self.diagnostics.push(diagnostic);
    }
}

/// Merge all three streams: materials, then dates, then tags
pub fn reconcile(
    materials: impl IntoIterator<Item = MaterialRecord>,
    dates: impl IntoIterator<Item = DateRecord>,
    tags: impl IntoIterator<Item = TagRecord>,
) -> MergeOutcome {
    let mut reconciler = Reconciler::new();
    reconciler.seed_materials(materials);
    reconciler.attach_dates(dates);
    reconciler.attach_tags(tags);
    reconciler.finish()
}

/// Parse a list literal of material names
///
/// The source writes lists Python-style (`['Bright Red', 'Van Dyke Brown']`),
/// sometimes with escaped or literal line breaks inside. Quotes are switched
/// to JSON quotes, line breaks and backslashes dropped, then the text is read
/// as a JSON string array. Names are trimmed; blank names are dropped. A blank
/// field is an empty list.
pub fn parse_material_list(field: &str) -> Result<Vec<String>, serde_json::Error> {
    if field.trim().is_empty() {
        return Ok(Vec::new());
    }

    let cleaned = field
        .replace('\'', "\"")
        .replace("\\r\\n", "")
        .replace("\\n", "")
        .replace("\r\n", "")
        .replace('\n', "")
        .replace('\\', "");

    let names: Vec<String> = serde_json::from_str(&cleaned)?;

    Ok(names
        .into_iter()
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .collect())
}

/// Parse free-text broadcast dates such as `January 11, 1983`
pub fn parse_broadcast_date(text: &str) -> Option<NaiveDate> {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");

    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(&collapsed, format).ok())
}
