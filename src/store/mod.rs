//! Read-only access to the census tables.
//!
//! A [`GeoStore`] hands out one [`GeoSession`] per operation. The session owns
//! whatever resource the backend needs (a pooled connection for Postgres) and
//! gives it back when dropped, so every exit path releases it.

mod filter;
mod memory;
mod postgres;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{GeoLevel, Geography};

pub use filter::{escape_like, GeoFilter};
pub use memory::{MemoryStore, MemoryTables};
pub use postgres::PgStore;

#[cfg(test)]
pub(crate) use memory::fixtures;

/// One row of the precomputed youth deprivation table.
#[derive(Debug, Clone, Default, PartialEq, sqlx::FromRow)]
pub struct YouthRow {
    pub youth_pop: Option<f64>,
    #[sqlx(rename = "youth_proportion")]
    pub youth_prop: Option<f64>,
    pub edu_dep: Option<f64>,
    pub disab_dep: Option<f64>,
    pub light_dep: Option<f64>,
    pub heat_dep: Option<f64>,
    pub cook_dep: Option<f64>,
    pub toilet_dep: Option<f64>,
    pub water_dep: Option<f64>,
    pub dwell_dep: Option<f64>,
    pub asset_dep: Option<f64>,
    pub emp_dep: Option<f64>,
    pub neets_dep: Option<f64>,
    pub prop_multid_poor: Option<f64>,
    pub youth_mpi: Option<f64>,
}

impl YouthRow {
    /// Look up an indicator by its profile key.
    pub fn indicator(&self, key: &str) -> Option<f64> {
        match key {
            "youth_pop" => self.youth_pop,
            "youth_prop" => self.youth_prop,
            "edu_dep" => self.edu_dep,
            "disab_dep" => self.disab_dep,
            "light_dep" => self.light_dep,
            "heat_dep" => self.heat_dep,
            "cook_dep" => self.cook_dep,
            "toilet_dep" => self.toilet_dep,
            "water_dep" => self.water_dep,
            "dwell_dep" => self.dwell_dep,
            "asset_dep" => self.asset_dep,
            "emp_dep" => self.emp_dep,
            "neets_dep" => self.neets_dep,
            "prop_multid_poor" => self.prop_multid_poor,
            "youth_mpi" => self.youth_mpi,
            _ => None,
        }
    }
}

/// Queries available inside a session.
#[async_trait]
pub trait GeoSession: Send {
    /// Fetch one record by primary key.
    async fn geography(
        &mut self,
        level: GeoLevel,
        code: &str,
        year: &str,
    ) -> Result<Option<Geography>>;

    /// Records of `level` in `year` matching `filter`, at most `limit`.
    async fn find_matching(
        &mut self,
        level: GeoLevel,
        filter: &GeoFilter,
        year: &str,
        limit: usize,
    ) -> Result<Vec<Geography>>;

    /// Wards owning the subplaces that match `filter`, at most `limit` rows.
    async fn wards_for_subplaces(
        &mut self,
        filter: &GeoFilter,
        year: &str,
        limit: usize,
    ) -> Result<Vec<Geography>>;

    /// `(population group, total)` rows for a geography.
    async fn population_groups(&mut self, level: GeoLevel, code: &str)
        -> Result<Vec<(String, f64)>>;

    async fn youth_row(&mut self, level: GeoLevel, code: &str) -> Result<Option<YouthRow>>;
}

#[async_trait]
pub trait GeoStore: Send + Sync {
    async fn open_session(&self) -> Result<Box<dyn GeoSession>>;
}
