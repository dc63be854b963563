//! Demographic profiles.
//!
//! A profile is a set of named sections, each computed by a
//! [`SectionBuilder`] registered in a [`ProfileRegistry`]. Every section is
//! computed for the requested geography and again for each of its summary
//! levels (province, country), whose values are merged in for comparison.

mod demographics;
mod depravation;
mod summary;

use async_trait::async_trait;
use tracing::debug;

use crate::error::Result;
use crate::models::{GeoLevel, Profile, Section};
use crate::store::{GeoSession, GeoStore};

pub use demographics::Demographics;
pub use depravation::Depravation;
pub use summary::summary_levels;

/// Computes one profile section for a geography.
#[async_trait]
pub trait SectionBuilder: Send + Sync {
    async fn build(
        &self,
        session: &mut dyn GeoSession,
        level: GeoLevel,
        code: &str,
    ) -> Result<Section>;
}

/// Ordered mapping from section name to its builder.
#[derive(Default)]
pub struct ProfileRegistry {
    sections: Vec<(&'static str, Box<dyn SectionBuilder>)>,
}

impl ProfileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The youth profile: demographics and youth deprivation.
    pub fn youth() -> Self {
        Self::new()
            .with_section("demographics", Demographics)
            .with_section("depravation", Depravation)
    }

    /// Register a builder, replacing any existing one with the same name.
    pub fn with_section(mut self, name: &'static str, builder: impl SectionBuilder + 'static) -> Self {
        let builder: Box<dyn SectionBuilder> = Box::new(builder);
        match self.sections.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = builder,
            None => self.sections.push((name, builder)),
        }
        self
    }

    /// Registered section names, in order.
    pub fn sections(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.sections.iter().map(|(name, _)| *name)
    }

    pub fn get(&self, name: &str) -> Option<&dyn SectionBuilder> {
        self.sections
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, b)| b.as_ref())
    }

    /// Build every registered section for `code` at `level` inside `session`.
    pub async fn build_in(
        &self,
        session: &mut dyn GeoSession,
        level: GeoLevel,
        code: &str,
    ) -> Result<Profile> {
        let summaries = summary_levels(session, level, code).await?;
        debug!("Profile for {}-{} with summaries {:?}", level, code, summaries);

        let mut profile = Profile::new();
        for (name, builder) in &self.sections {
            let mut section = builder.build(session, level, code).await?;

            for (summary_level, summary_code) in &summaries {
                let summary = builder.build(session, *summary_level, summary_code).await?;
                section.merge_summary(&summary, summary_level.as_str());
            }

            profile.insert(name.to_string(), section);
        }

        Ok(profile)
    }
}

/// Build the profile for the geography `level`-`code`.
pub async fn build_profile(
    store: &dyn GeoStore,
    registry: &ProfileRegistry,
    code: &str,
    level: &str,
) -> Result<Profile> {
    let level: GeoLevel = level.parse()?;
    let mut session = store.open_session().await?;
    registry.build_in(session.as_mut(), level, code).await
}
