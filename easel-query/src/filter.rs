//! Filter composer
//!
//! Turns a request's filter dimensions and match mode into a [`QueryPlan`].
//!
//! **Semantics:**
//! - Months: broadcast month in the requested set, whatever the mode
//! - Tags / materials under `all`: every requested name is linked
//! - Tags / materials under `any`: at least one requested name is linked
//! - Dimensions combine by intersection under `all`, by union under `any`
//!
//! The one mode drives both levels. An empty dimension is inactive; a request
//! with no active dimension is rejected before storage is touched.

use easel_common::VocabularyKind;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::str::FromStr;
use thiserror::Error;

use crate::model::EpisodeView;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("At least one filter (months, tags or materials) is required")]
    NoFilter,

    #[error("Invalid match mode '{0}', expected 'all' or 'any'")]
    InvalidMode(String),

    #[error("Invalid month '{0}', expected a number from 1 to 12")]
    InvalidMonth(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MatchMode {
    #[default]
    All,
    Any,
}

impl FromStr for MatchMode {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(MatchMode::All),
            "any" => Ok(MatchMode::Any),
            _ => Err(FilterError::InvalidMode(s.to_string())),
        }
    }
}

/// Raw query string parameters for `GET /episodes`
///
/// Lists are comma separated. The older names `subjects`, `colors` and
/// `match_type` are accepted too.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterRequest {
    pub months: Option<String>,
    #[serde(alias = "subjects")]
    pub tags: Option<String>,
    #[serde(alias = "colors")]
    pub materials: Option<String>,
    #[serde(alias = "match_type")]
    pub mode: Option<String>,
}

/// Validated filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterCriteria {
    pub months: BTreeSet<u32>,
    pub tags: BTreeSet<String>,
    pub materials: BTreeSet<String>,
    pub mode: MatchMode,
}

impl FilterCriteria {
    /// Validate a request: month values, then presence of a filter, then mode
    pub fn from_request(request: &FilterRequest) -> Result<Self, FilterError> {
        let months = split_list(request.months.as_deref())
            .map(parse_month)
            .collect::<Result<BTreeSet<_>, _>>()?;
        let tags: BTreeSet<String> = split_list(request.tags.as_deref())
            .map(str::to_string)
            .collect();
        let materials: BTreeSet<String> = split_list(request.materials.as_deref())
            .map(str::to_string)
            .collect();

        if months.is_empty() && tags.is_empty() && materials.is_empty() {
            return Err(FilterError::NoFilter);
        }

        let mode = match request.mode.as_deref() {
            Some(mode) if !mode.trim().is_empty() => mode.parse::<MatchMode>()?,
            _ => MatchMode::default(),
        };

        Ok(Self {
            months,
            tags,
            materials,
            mode,
        })
    }

    /// Build the plan: months, tags, materials, in that order
    pub fn plan(&self) -> QueryPlan {
        let mut predicates = Vec::new();

        if !self.months.is_empty() {
            predicates.push(SubPredicate::MonthIn(self.months.clone()));
        }
        for (kind, names) in [
            (VocabularyKind::Tag, &self.tags),
            (VocabularyKind::Material, &self.materials),
        ] {
            if names.is_empty() {
                continue;
            }
            let names = names.clone();
            predicates.push(match self.mode {
                MatchMode::All => SubPredicate::LinkedAll { kind, names },
                MatchMode::Any => SubPredicate::LinkedAny { kind, names },
            });
        }

        let combinator = match self.mode {
            MatchMode::All => Combinator::Intersect,
            MatchMode::Any => Combinator::Union,
        };

        QueryPlan {
            predicates,
            combinator,
        }
    }
}

/// Membership test producing one set of episode ids
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubPredicate {
    MonthIn(BTreeSet<u32>),
    LinkedAll {
        kind: VocabularyKind,
        names: BTreeSet<String>,
    },
    LinkedAny {
        kind: VocabularyKind,
        names: BTreeSet<String>,
    },
}

impl SubPredicate {
    pub fn matches(&self, episode: &EpisodeView) -> bool {
        match self {
            SubPredicate::MonthIn(months) => months.contains(&episode.broadcast_month()),
            SubPredicate::LinkedAll { kind, names } => {
                let linked = episode.linked(*kind);
                names.iter().all(|name| linked.contains(name))
            }
            SubPredicate::LinkedAny { kind, names } => {
                let linked = episode.linked(*kind);
                names.iter().any(|name| linked.contains(name))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    Intersect,
    Union,
}

impl Combinator {
    pub fn sql_keyword(self) -> &'static str {
        match self {
            Combinator::Intersect => "INTERSECT",
            Combinator::Union => "UNION",
        }
    }
}

/// Storage-independent description of a filter query
///
/// Rendered to SQL by [`crate::db::find_episodes`]; [`QueryPlan::evaluate`]
/// applies the same algebra to episodes already in memory. A plan without
/// predicates matches nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPlan {
    pub predicates: Vec<SubPredicate>,
    pub combinator: Combinator,
}

impl QueryPlan {
    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn matches(&self, episode: &EpisodeView) -> bool {
        if self.predicates.is_empty() {
            return false;
        }
        match self.combinator {
            Combinator::Intersect => self.predicates.iter().all(|p| p.matches(episode)),
            Combinator::Union => self.predicates.iter().any(|p| p.matches(episode)),
        }
    }

    /// Matching episodes ordered by season, episode number, id
    pub fn evaluate<'a>(&self, episodes: &'a [EpisodeView]) -> Vec<&'a EpisodeView> {
        let mut matched: Vec<&EpisodeView> =
            episodes.iter().filter(|e| self.matches(e)).collect();
        matched.sort_by_key(|e| e.sort_key());
        matched
    }
}

fn split_list(value: Option<&str>) -> impl Iterator<Item = &str> {
    value
        .unwrap_or("")
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
}

fn parse_month(item: &str) -> Result<u32, FilterError> {
    match item.parse::<u32>() {
        Ok(month) if (1..=12).contains(&month) => Ok(month),
        _ => Err(FilterError::InvalidMonth(item.to_string())),
    }
}
