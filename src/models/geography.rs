//! Geography records and their display form.

use serde::{Deserialize, Serialize};

use super::GeoLevel;

/// Reporting year used when the caller doesn't give one.
pub const DEFAULT_YEAR: &str = "2011";

/// Codes of the geographies containing a record.
///
/// These are lookups by code, not owned records: the parents live in their
/// own tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Parents {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ward_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub municipality_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub district_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub province_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
}

impl Parents {
    /// Code of the containing geography at `level`, if known.
    pub fn code_at(&self, level: GeoLevel) -> Option<&str> {
        match level {
            GeoLevel::Ward => self.ward_code.as_deref(),
            GeoLevel::Municipality => self.municipality_code.as_deref(),
            GeoLevel::District => self.district_code.as_deref(),
            GeoLevel::Province => self.province_code.as_deref(),
            GeoLevel::Country => self.country_code.as_deref(),
            GeoLevel::Subplace => None,
        }
    }
}

/// Fields only some levels carry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LevelDetail {
    #[default]
    None,
    Ward {
        ward_no: Option<i64>,
    },
    Subplace {
        subplace_name: Option<String>,
        mainplace_name: Option<String>,
    },
}

/// A single geography record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geography {
    pub level: GeoLevel,
    pub code: String,
    pub year: String,

    /// Short name; wards have none
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    pub long_name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub square_kms: Option<f64>,

    #[serde(default)]
    pub parents: Parents,

    #[serde(default)]
    pub detail: LevelDetail,
}

impl Geography {
    /// Create a record with only the required fields set
    pub fn new(level: GeoLevel, code: impl Into<String>, long_name: impl Into<String>) -> Self {
        Self {
            level,
            code: code.into(),
            year: DEFAULT_YEAR.to_string(),
            name: None,
            long_name: long_name.into(),
            square_kms: None,
            parents: Parents::default(),
            detail: LevelDetail::None,
        }
    }

    /// Name if present, else code. Used to order search results.
    pub fn display_key(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.code)
    }

    /// Composite identifier, e.g. `ward-21004005`.
    pub fn geoid(&self) -> String {
        format!("{}-{}", self.level, self.code)
    }

    pub fn ward_no(&self) -> Option<i64> {
        match self.detail {
            LevelDetail::Ward { ward_no } => ward_no,
            _ => None,
        }
    }

    pub fn subplace_name(&self) -> Option<&str> {
        match &self.detail {
            LevelDetail::Subplace { subplace_name, .. } => subplace_name.as_deref(),
            _ => None,
        }
    }

    pub fn mainplace_name(&self) -> Option<&str> {
        match &self.detail {
            LevelDetail::Subplace { mainplace_name, .. } => mainplace_name.as_deref(),
            _ => None,
        }
    }

    /// Area in square kilometres, when known and non-zero.
    pub fn area(&self) -> Option<f64> {
        self.square_kms.filter(|kms| *kms != 0.0)
    }
}

/// Display-ready form of a geography.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Demarcation {
    pub full_name: String,
    pub full_geoid: String,
    pub geo_level: GeoLevel,
    pub geo_code: String,
}

impl From<&Geography> for Demarcation {
    fn from(geo: &Geography) -> Self {
        Self {
            full_name: geo.long_name.clone(),
            full_geoid: geo.geoid(),
            geo_level: geo.level,
            geo_code: geo.code.clone(),
        }
    }
}

/// Serialize a sequence of geographies, keeping their order.
pub fn serialize_demarcations<'a, I>(geos: I) -> Vec<Demarcation>
where
    I: IntoIterator<Item = &'a Geography>,
{
    geos.into_iter().map(Demarcation::from).collect()
}
