//! Profile structures returned by the profile endpoint.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;

/// Key under which a geography's own value is stored.
pub const THIS: &str = "this";

/// A single statistic with its value for the geography and its ancestors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stat {
    pub name: String,
    #[serde(serialize_with = "serialize_values")]
    pub values: BTreeMap<String, f64>,
}

/// Largest magnitude at which every integer is exact in an `f64`.
const MAX_EXACT_INT: f64 = 9_007_199_254_740_992.0;

/// Whole numbers are written as integers, so counts read `10000` not `10000.0`.
fn serialize_values<S: Serializer>(
    values: &BTreeMap<String, f64>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(values.len()))?;
    for (key, value) in values {
        if value.fract() == 0.0 && value.abs() <= MAX_EXACT_INT {
            map.serialize_entry(key, &(*value as i64))?;
        } else {
            map.serialize_entry(key, value)?;
        }
    }
    map.end()
}

impl Stat {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        let mut values = BTreeMap::new();
        values.insert(THIS.to_string(), value);
        Self {
            name: name.into(),
            values,
        }
    }

    /// Value for the geography the profile was built for
    pub fn this(&self) -> Option<f64> {
        self.values.get(THIS).copied()
    }
}

/// A named group of statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Section {
    /// Optional label for the whole section (e.g. "youth")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(flatten)]
    pub stats: BTreeMap<String, Stat>,
}

impl Section {
    pub fn insert(&mut self, key: impl Into<String>, stat: Stat) {
        self.stats.insert(key.into(), stat);
    }

    pub fn get(&self, key: &str) -> Option<&Stat> {
        self.stats.get(key)
    }

    /// Merge an ancestor's section into this one.
    ///
    /// Every stat already present here picks up the ancestor's own value under
    /// `key`. Stats only the ancestor has are ignored; stats the ancestor lacks
    /// are left as they are.
    pub fn merge_summary(&mut self, other: &Section, key: &str) {
        for (stat_key, stat) in self.stats.iter_mut() {
            if let Some(value) = other.get(stat_key).and_then(Stat::this) {
                stat.values.insert(key.to_string(), value);
            }
        }
    }
}

/// Section name -> section.
pub type Profile = BTreeMap<String, Section>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_summary() {
        let mut ward = Section::default();
        ward.insert("total_population", Stat::new("People", 100.0));
        ward.insert("population_density", Stat::new("people per square kilometre", 4.0));

        let mut province = Section::default();
        province.insert("total_population", Stat::new("People", 5000.0));
        province.insert("households", Stat::new("Households", 1200.0));

        ward.merge_summary(&province, "province");

        let total = ward.get("total_population").unwrap();
        assert_eq!(total.values.get("this"), Some(&100.0));
        assert_eq!(total.values.get("province"), Some(&5000.0));

        // Ancestor lacks density: left unmerged
        let density = ward.get("population_density").unwrap();
        assert_eq!(density.values.len(), 1);

        // Ancestor-only stats are not copied in
        assert!(ward.get("households").is_none());
    }

    #[test]
    fn test_section_serializes_flat() {
        let mut section = Section {
            name: Some("youth".to_string()),
            ..Default::default()
        };
        section.insert("edu_dep", Stat::new("Deprived in educational attainment", 0.25));

        let json = serde_json::to_value(&section).unwrap();
        assert_eq!(json["name"], "youth");
        assert_eq!(json["edu_dep"]["values"]["this"], 0.25);
        assert_eq!(json["edu_dep"]["name"], "Deprived in educational attainment");
    }

    #[test]
    fn test_whole_values_serialize_as_integers() {
        let mut stat = Stat::new("People", 10_000.0);
        stat.values.insert("province".to_string(), 2.5);
        stat.values.insert("country".to_string(), 0.0);

        let json = serde_json::to_string(&stat).unwrap();
        assert_eq!(
            json,
            r#"{"name":"People","values":{"country":0,"province":2.5,"this":10000}}"#
        );

        let back: Stat = serde_json::from_str(&json).unwrap();
        assert_eq!(back, stat);
    }
}
