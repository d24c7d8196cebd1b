//! Response records

use chrono::{Datelike, NaiveDate};
use easel_common::VocabularyKind;
use serde::{Deserialize, Serialize};

/// A persisted episode with its linked names
///
/// `materials` and `tags` are sorted and deduplicated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeView {
    pub id: i64,
    pub title: String,
    pub season: u32,
    pub episode_number: u32,
    pub broadcast_date: NaiveDate,
    pub materials: Vec<String>,
    pub tags: Vec<String>,
}

impl EpisodeView {
    pub fn broadcast_month(&self) -> u32 {
        self.broadcast_date.month()
    }

    pub fn linked(&self, kind: VocabularyKind) -> &[String] {
        match kind {
            VocabularyKind::Material => &self.materials,
            VocabularyKind::Tag => &self.tags,
        }
    }

    /// Result ordering: season, episode number, id
    pub fn sort_key(&self) -> (u32, u32, i64) {
        (self.season, self.episode_number, self.id)
    }
}
