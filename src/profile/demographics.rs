use async_trait::async_trait;

use super::SectionBuilder;
use crate::error::Result;
use crate::geography::resolve_in;
use crate::models::{GeoLevel, Section, Stat};
use crate::store::GeoSession;

/// Total population and, where the area is known, population density.
pub struct Demographics;

#[async_trait]
impl SectionBuilder for Demographics {
    async fn build(
        &self,
        session: &mut dyn GeoSession,
        level: GeoLevel,
        code: &str,
    ) -> Result<Section> {
        let groups = session.population_groups(level, code).await?;
        let total_pop: f64 = groups.iter().map(|(_, total)| total).sum();

        let mut section = Section::default();
        section.insert("total_population", Stat::new("People", total_pop));

        let geo = resolve_in(session, level, code).await?;
        if let Some(square_kms) = geo.area() {
            section.insert(
                "population_density",
                Stat::new("people per square kilometre", total_pop / square_kms),
            );
        }

        Ok(section)
    }
}
