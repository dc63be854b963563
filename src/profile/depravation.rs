use async_trait::async_trait;

use super::SectionBuilder;
use crate::error::{GeoError, Result};
use crate::models::{GeoLevel, Section, Stat};
use crate::store::GeoSession;

/// Youth deprivation indicators and their display names.
const INDICATORS: &[(&str, &str)] = &[
    ("youth_pop", "Population (age 15-24)"),
    (
        "youth_prop",
        "Youth (age 15-24) as a percentage of total population",
    ),
    ("edu_dep", "Deprived in educational attainment"),
    (
        "disab_dep",
        "Experiencing difficulty in one or more of the following functions: hearing, vision, \
         communication, mobility, cognition and self-care",
    ),
    (
        "light_dep",
        "Living in households without use of electricity, gas or solar energy for light",
    ),
    (
        "heat_dep",
        "Living in households without use of electricity, gas or solar energy for heat",
    ),
    (
        "cook_dep",
        "Living in households without use of electricity, gas or solar energy for cooking",
    ),
    ("toilet_dep", "Living in households without a flush toilet"),
    (
        "water_dep",
        "Living in households without piped water on site",
    ),
    (
        "dwell_dep",
        "Living in households that are informal shacks/traditional dwellings/caravans/tents/other",
    ),
    (
        "asset_dep",
        "Living in households that do not own more than two of the following 'small' assets: \
         radio, TV, landline, mobile phone, bike, motorbike or refrigerator AND does not own a \
         car or truck",
    ),
    (
        "emp_dep",
        "Living in households where no working-age adults (age 18-64) are employed",
    ),
    ("neets_dep", "Not in education, employment or training"),
    ("prop_multid_poor", "considered Multidimensionally poor"),
    ("youth_mpi", "Youth Multidimensional Poverty Index score"),
];

/// Youth multidimensional poverty, read from the precomputed `youth` table.
pub struct Depravation;

#[async_trait]
impl SectionBuilder for Depravation {
    async fn build(
        &self,
        session: &mut dyn GeoSession,
        level: GeoLevel,
        code: &str,
    ) -> Result<Section> {
        let row = session.youth_row(level, code).await?.ok_or_else(|| {
            GeoError::NotFound(format!("No youth data for {}-{}", level, code))
        })?;

        let mut section = Section {
            name: Some("youth".to_string()),
            ..Default::default()
        };
        for (key, label) in INDICATORS {
            // Missing values count as zero
            let value = row.indicator(key).unwrap_or(0.0);
            section.insert(*key, Stat::new(*label, value));
        }

        Ok(section)
    }
}
