//! Typed source records
//!
//! Raw rows and lines are validated here, once, at the boundary. The
//! reconciliation engine only ever sees these structs. Field *contents* that
//! the engine is responsible for interpreting (material list, date text, flag
//! values) are carried through as raw strings.

use easel_common::config::MaterialColumns;
use easel_common::NormalizedTitle;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

use crate::diagnostics::{Diagnostic, DiagnosticKind, SourceKind};
use crate::source::RawRecord;

/// `"Title" (date text)` anywhere in a line
static DATE_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""([^"]+)" \(([^)]+)\)"#).expect("date line pattern is valid"));

/// Marker value for a set flag column
pub const FLAG_SET: &str = "1";

/// Broadcast date contribution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateRecord {
    pub raw_title: String,
    pub raw_date: String,
}

impl DateRecord {
    /// Parse one line of the date source
    ///
    /// Blank lines yield `None`; lines without the `"Title" (date)` shape
    /// yield a MalformedRecord diagnostic.
    pub fn parse_line(line: &str) -> Option<Result<Self, Diagnostic>> {
        if line.trim().is_empty() {
            return None;
        }

        let parsed = DATE_LINE.captures(line).map(|caps| Self {
            raw_title: caps[1].to_string(),
            raw_date: caps[2].trim().to_string(),
        });

        Some(parsed.ok_or_else(|| {
            Diagnostic::new(
                DiagnosticKind::MalformedRecord,
                SourceKind::Dates,
                None,
                line.trim(),
            )
        }))
    }
}

/// Material contribution; defines episode existence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterialRecord {
    pub raw_title: String,
    pub season: u32,
    pub episode_number: u32,
    /// List literal such as `['Alizarin Crimson', 'Bright Red']`
    pub materials_field: String,
}

impl MaterialRecord {
    pub fn from_raw(row: &RawRecord, columns: &MaterialColumns) -> Result<Self, Diagnostic> {
        let raw_title = row.get(&columns.title).cloned().unwrap_or_default();
        let title = NormalizedTitle::new(&raw_title);
        if title.is_empty() {
            return Err(malformed(SourceKind::Materials, None, describe_row(row)));
        }

        let season = parse_number(row, &columns.season);
        let episode_number = parse_number(row, &columns.episode);
        let (season, episode_number) = match (season, episode_number) {
            (Some(s), Some(e)) => (s, e),
            _ => {
                return Err(malformed(
                    SourceKind::Materials,
                    Some(title.into_string()),
                    format!(
                        "{}={:?} {}={:?}",
                        columns.season,
                        row.get(&columns.season).map(String::as_str).unwrap_or(""),
                        columns.episode,
                        row.get(&columns.episode).map(String::as_str).unwrap_or(""),
                    ),
                ))
            }
        };

        Ok(Self {
            raw_title,
            season,
            episode_number,
            materials_field: row.get(&columns.materials).cloned().unwrap_or_default(),
        })
    }
}

/// Tag contribution: every non-title column is a flag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRecord {
    pub raw_title: String,
    /// Flag column name -> raw cell value
    pub flags: BTreeMap<String, String>,
}

impl TagRecord {
    pub fn from_raw(row: &RawRecord, title_column: &str) -> Result<Self, Diagnostic> {
        let raw_title = row.get(title_column).cloned().unwrap_or_default();
        if NormalizedTitle::new(&raw_title).is_empty() {
            return Err(malformed(SourceKind::Tags, None, describe_row(row)));
        }

        let flags = row
            .iter()
            .filter(|(column, _)| column.as_str() != title_column)
            .map(|(column, value)| (column.clone(), value.clone()))
            .collect();

        Ok(Self { raw_title, flags })
    }

    /// Names of flag columns carrying the set marker
    pub fn set_flags(&self) -> impl Iterator<Item = &str> {
        self.flags
            .iter()
            .filter(|(_, value)| value.trim() == FLAG_SET)
            .map(|(column, _)| column.as_str())
    }
}

fn parse_number(row: &RawRecord, column: &str) -> Option<u32> {
    row.get(column).and_then(|v| v.trim().parse().ok())
}

fn malformed(source: SourceKind, title: Option<String>, value: String) -> Diagnostic {
    Diagnostic::new(DiagnosticKind::MalformedRecord, source, title, value)
}

fn describe_row(row: &RawRecord) -> String {
    row.iter()
        .map(|(k, v)| format!("{}={:?}", k, v))
        .collect::<Vec<_>>()
        .join(" ")
}
