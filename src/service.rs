//! Entry point bundling the store, point search and profile sections.

use std::sync::Arc;

use crate::error::Result;
use crate::geography;
use crate::models::{Demarcation, Geography, Profile};
use crate::pointsearch::PointSearch;
use crate::profile::{self, ProfileRegistry};
use crate::store::GeoStore;

#[derive(Clone)]
pub struct GeoService {
    store: Arc<dyn GeoStore>,
    point_search: Arc<dyn PointSearch>,
    profiles: Arc<ProfileRegistry>,
}

impl GeoService {
    pub fn new(
        store: Arc<dyn GeoStore>,
        point_search: Arc<dyn PointSearch>,
        profiles: ProfileRegistry,
    ) -> Self {
        Self {
            store,
            point_search,
            profiles: Arc::new(profiles),
        }
    }

    pub async fn resolve(&self, code: &str, level: &str) -> Result<Geography> {
        geography::resolve(self.store.as_ref(), code, level).await
    }

    pub async fn search(
        &self,
        term: &str,
        levels: Option<&str>,
        year: Option<&str>,
    ) -> Result<Vec<Demarcation>> {
        geography::search(self.store.as_ref(), term, levels, year).await
    }

    pub async fn locations_from_coords(
        &self,
        longitude: f64,
        latitude: f64,
    ) -> Result<Vec<Demarcation>> {
        geography::locations_from_coords(
            self.store.as_ref(),
            self.point_search.as_ref(),
            longitude,
            latitude,
        )
        .await
    }

    pub async fn build_profile(&self, code: &str, level: &str) -> Result<Profile> {
        profile::build_profile(self.store.as_ref(), &self.profiles, code, level).await
    }

    pub fn profiles(&self) -> &ProfileRegistry {
        &self.profiles
    }
}
