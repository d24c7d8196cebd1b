//! Episode entity model
//!
//! An [`Episode`] is assembled in memory from up to three partial
//! contributions (materials, broadcast date, tags) and then persisted by the
//! loader. Materials and tags are stored as sets so repeated names collapse
//! and iteration order is stable.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::title::NormalizedTitle;

/// Unified episode entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Episode {
    /// Identity: normalized title shared by all sources
    pub title: NormalizedTitle,
    pub season: u32,
    /// Sequence number within the season
    pub episode_number: u32,
    /// Absent until a matching date record is attached
    pub broadcast_date: Option<NaiveDate>,
    pub materials: BTreeSet<String>,
    pub tags: BTreeSet<String>,
}

impl Episode {
    /// Seed an episode from its material contribution
    pub fn new(
        title: NormalizedTitle,
        season: u32,
        episode_number: u32,
        materials: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            title,
            season,
            episode_number,
            broadcast_date: None,
            materials: materials.into_iter().collect(),
            tags: BTreeSet::new(),
        }
    }

    /// Only dated episodes are persisted
    pub fn is_persistable(&self) -> bool {
        self.broadcast_date.is_some()
    }
}

/// Master vocabulary kinds linked to episodes
///
/// Table and column names are compile-time constants; they are the only
/// identifiers ever interpolated into SQL text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VocabularyKind {
    Material,
    Tag,
}

impl VocabularyKind {
    pub const ALL: [VocabularyKind; 2] = [VocabularyKind::Material, VocabularyKind::Tag];

    /// Master table holding `(id, name)`
    pub fn table(self) -> &'static str {
        match self {
            VocabularyKind::Material => "materials",
            VocabularyKind::Tag => "tags",
        }
    }

    /// Junction table linking episodes to this vocabulary
    pub fn link_table(self) -> &'static str {
        match self {
            VocabularyKind::Material => "episode_materials",
            VocabularyKind::Tag => "episode_tags",
        }
    }

    /// Foreign key column in the junction table
    pub fn link_column(self) -> &'static str {
        match self {
            VocabularyKind::Material => "material_id",
            VocabularyKind::Tag => "tag_id",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            VocabularyKind::Material => "material",
            VocabularyKind::Tag => "tag",
        }
    }
}

impl std::fmt::Display for VocabularyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_episode_has_no_date_or_tags() {
        let episode = Episode::new(
            NormalizedTitle::new("Winter Mist"),
            1,
            2,
            vec!["Titanium White".to_string(), "Titanium White".to_string()],
        );

        assert!(episode.broadcast_date.is_none());
        assert!(episode.tags.is_empty());
        assert_eq!(episode.materials.len(), 1);
        assert!(!episode.is_persistable());
    }

    #[test]
    fn test_vocabulary_tables_are_distinct() {
        assert_ne!(VocabularyKind::Material.table(), VocabularyKind::Tag.table());
        assert_ne!(
            VocabularyKind::Material.link_table(),
            VocabularyKind::Tag.link_table()
        );
    }
}
