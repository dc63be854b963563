//! Match conditions pushed down to the stores.

use crate::models::{GeoLevel, Geography};

const CITY_OF: &str = "City of ";

/// A per-level search condition.
///
/// Prefix comparisons are case-insensitive, code comparisons exact.
#[derive(Debug, Clone, PartialEq)]
pub enum GeoFilter {
    /// Name starts with `prefix` or with "City of " + `prefix`, or code equals `code`
    Name { prefix: String, code: String },

    /// Code starts with `code_prefix`, or ward number equals `ward_no`
    Ward {
        code_prefix: String,
        ward_no: Option<i64>,
    },

    /// Subplace name starts with `prefix` or "City of " + `prefix`, mainplace
    /// name starts with `prefix`, or code equals `code`
    Subplace { prefix: String, code: String },
}

impl GeoFilter {
    /// Level whose table this filter reads.
    pub fn target_level(&self) -> Option<GeoLevel> {
        match self {
            GeoFilter::Name { .. } => None,
            GeoFilter::Ward { .. } => Some(GeoLevel::Ward),
            GeoFilter::Subplace { .. } => Some(GeoLevel::Subplace),
        }
    }

    /// City-prefixed variant of a name prefix.
    pub fn city_prefix(prefix: &str) -> String {
        format!("{}{}", CITY_OF, prefix)
    }

    /// Evaluate the filter against a record in memory.
    pub fn matches(&self, geo: &Geography) -> bool {
        match self {
            GeoFilter::Name { prefix, code } => {
                let name_hit = geo.name.as_deref().is_some_and(|name| {
                    starts_with_ci(name, prefix) || starts_with_ci(name, &Self::city_prefix(prefix))
                });
                name_hit || geo.code == *code
            }
            GeoFilter::Ward {
                code_prefix,
                ward_no,
            } => {
                geo.code.starts_with(code_prefix.as_str())
                    || ward_no.is_some_and(|no| geo.ward_no() == Some(no))
            }
            GeoFilter::Subplace { prefix, code } => {
                let subplace_hit = geo.subplace_name().is_some_and(|name| {
                    starts_with_ci(name, prefix) || starts_with_ci(name, &Self::city_prefix(prefix))
                });
                let mainplace_hit = geo
                    .mainplace_name()
                    .is_some_and(|name| starts_with_ci(name, prefix));
                subplace_hit || mainplace_hit || geo.code == *code
            }
        }
    }
}

fn starts_with_ci(haystack: &str, prefix: &str) -> bool {
    haystack.to_lowercase().starts_with(&prefix.to_lowercase())
}

/// Escape LIKE wildcards so user input is matched literally.
pub fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
