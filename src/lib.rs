//! census-geo - Geography lookup and demographic profiles for census data
//!
//! This library provides geography resolution, search, reverse geocoding to
//! wards and profile aggregation for the server binary.

pub mod config;
pub mod error;
pub mod geography;
pub mod models;
pub mod pointsearch;
pub mod profile;
pub mod service;
pub mod store;

pub use error::GeoError;
pub use models::{Demarcation, GeoLevel, Geography, Profile};
pub use service::GeoService;
