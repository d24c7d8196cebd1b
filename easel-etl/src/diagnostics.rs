//! Per-batch diagnostics
//!
//! Record-level problems never abort a batch. Each one becomes a
//! [`Diagnostic`] that is logged when raised and returned in the batch report.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which input stream a record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Dates,
    Materials,
    Tags,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourceKind::Dates => "dates",
            SourceKind::Materials => "materials",
            SourceKind::Tags => "tags",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Row or line missing a required field; the record was skipped
    MalformedRecord,
    /// Material list could not be parsed; treated as empty
    MalformedMaterials,
    /// Broadcast date could not be parsed; the date record was skipped
    MalformedDate,
    /// Title matched no seeded episode; the record was dropped
    OrphanRecord,
    /// Second material record for a title; it replaced the first
    DuplicateTitle,
}

impl DiagnosticKind {
    /// Orphans are expected noise and stay out of the warning log
    pub fn is_warning(self) -> bool {
        !matches!(self, DiagnosticKind::OrphanRecord)
    }
}

/// One record-level event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub source: SourceKind,
    /// Normalized title when one could be derived
    pub title: Option<String>,
    /// Offending value (raw field text, line, or reader error)
    pub value: String,
}

impl Diagnostic {
    pub fn new(
        kind: DiagnosticKind,
        source: SourceKind,
        title: Option<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            source,
            title,
            value: value.into(),
        }
    }

    /// Log at warn (or debug for orphans)
    pub fn log(&self) {
        if self.kind.is_warning() {
            tracing::warn!(
                kind = ?self.kind,
                source = %self.source,
                title = self.title.as_deref().unwrap_or(""),
                value = %self.value,
                "Record problem"
            );
        } else {
            tracing::debug!(
                kind = ?self.kind,
                source = %self.source,
                title = self.title.as_deref().unwrap_or(""),
                "Record dropped"
            );
        }
    }
}

/// Count diagnostics of one kind
pub fn count_kind(diagnostics: &[Diagnostic], kind: DiagnosticKind) -> usize {
    diagnostics.iter().filter(|d| d.kind == kind).count()
}
