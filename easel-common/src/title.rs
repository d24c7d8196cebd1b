//! Title normalization
//!
//! Every source names an episode by its title, but each source formats it
//! differently (surrounding quotes, "Mt." vs "Mount", mixed case). The
//! normalized form is the only join key between the date, material and tag
//! sources. Two records describe the same episode iff their normalized titles
//! are byte-identical; near misses are not reconciled.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Abbreviation expanded during normalization (first occurrence only)
const MOUNT_ABBREVIATION: &str = "Mt.";
const MOUNT_EXPANDED: &str = "Mount";

/// Normalized episode title
///
/// Construct with [`NormalizedTitle::new`]; the inner string is always in
/// normalized form, so normalizing it again is a no-op.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizedTitle(String);

impl NormalizedTitle {
    /// Normalize a raw title from any source
    ///
    /// Steps, in order: strip double quotes, expand the first "Mt.",
    /// trim surrounding whitespace, uppercase.
    pub fn new(raw: &str) -> Self {
        let unquoted = raw.replace('"', "");
        let expanded = unquoted.replacen(MOUNT_ABBREVIATION, MOUNT_EXPANDED, 1);
        Self(expanded.trim().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the raw title contained nothing but quotes and whitespace
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for NormalizedTitle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NormalizedTitle {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
