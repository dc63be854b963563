//! Geography levels and their backing tables.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::GeoError;

/// Administrative tier of a geography record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum GeoLevel {
    Country,
    Province,
    District,
    Municipality,
    Ward,
    Subplace,
}

impl GeoLevel {
    /// Get all levels in hierarchical order (country first)
    pub fn all() -> &'static [GeoLevel] {
        &[
            GeoLevel::Country,
            GeoLevel::Province,
            GeoLevel::District,
            GeoLevel::Municipality,
            GeoLevel::Ward,
            GeoLevel::Subplace,
        ]
    }

    /// Levels searched when the caller doesn't name any.
    pub fn default_search_levels() -> &'static [GeoLevel] {
        &[
            GeoLevel::Country,
            GeoLevel::Province,
            GeoLevel::Municipality,
            GeoLevel::Ward,
            GeoLevel::Subplace,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GeoLevel::Country => "country",
            GeoLevel::Province => "province",
            GeoLevel::District => "district",
            GeoLevel::Municipality => "municipality",
            GeoLevel::Ward => "ward",
            GeoLevel::Subplace => "subplace",
        }
    }

    /// Table holding the records for this level.
    pub fn table_name(&self) -> &'static str {
        // Tables are named after the level.
        self.as_str()
    }

    /// Position of this level in search results (lower sorts first).
    ///
    /// Provinces lead, then districts, municipalities, wards and subplaces,
    /// with countries last.
    pub fn search_rank(&self) -> u8 {
        match self {
            GeoLevel::Province => 1,
            GeoLevel::District => 2,
            GeoLevel::Municipality => 3,
            GeoLevel::Ward => 4,
            GeoLevel::Subplace => 5,
            GeoLevel::Country => 6,
        }
    }

    /// Parse a comma-separated list of levels, e.g. `"province,ward"`.
    ///
    /// Empty entries are ignored. Fails on the first unknown name.
    pub fn parse_list(levels: &str) -> Result<Vec<GeoLevel>, GeoError> {
        levels
            .split(',')
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::parse)
            .collect()
    }
}

impl fmt::Display for GeoLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GeoLevel {
    type Err = GeoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "country" => Ok(GeoLevel::Country),
            "province" => Ok(GeoLevel::Province),
            "district" => Ok(GeoLevel::District),
            "municipality" => Ok(GeoLevel::Municipality),
            "ward" => Ok(GeoLevel::Ward),
            "subplace" => Ok(GeoLevel::Subplace),
            other => Err(GeoError::InvalidLevel(other.to_string())),
        }
    }
}

/// Map a level name to the table backing it.
pub fn level_to_model(level: &str) -> Result<&'static str, GeoError> {
    level.parse::<GeoLevel>().map(|l| l.table_name())
}

/// Map a table name back to its level.
pub fn model_to_geo_level(table: &str) -> Option<GeoLevel> {
    GeoLevel::all()
        .iter()
        .copied()
        .find(|l| l.table_name() == table)
}
