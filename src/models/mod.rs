//! Core data models for the census geography service.

pub mod geography;
pub mod level;
pub mod profile;

pub use geography::{
    serialize_demarcations, Demarcation, Geography, LevelDetail, Parents, DEFAULT_YEAR,
};
pub use level::{level_to_model, model_to_geo_level, GeoLevel};
pub use profile::{Profile, Section, Stat, THIS};
