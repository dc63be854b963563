//! Error types for lookups and profile building.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GeoError {
    /// Level name outside the known enumeration
    #[error("Invalid level: {0}")]
    InvalidLevel(String),

    /// Geography or statistics row does not exist
    #[error("{0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The coordinate lookup service failed
    #[error("Point search failed: {0}")]
    PointSearch(String),

    /// Malformed stored data
    #[error("Invalid data: {0}")]
    Data(String),
}

impl GeoError {
    pub fn not_found(level: impl std::fmt::Display, code: &str) -> Self {
        GeoError::NotFound(format!("Invalid level and code: {}-{}", level, code))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, GeoError::NotFound(_))
    }
}

pub type Result<T, E = GeoError> = std::result::Result<T, E>;
