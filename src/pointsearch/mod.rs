//! Point-in-ward lookup.
//!
//! Given a `"lat,lon"` query, a [`PointSearch`] backend returns the wards
//! containing that point. Two backends are provided: a client for a remote
//! ward lookup API and a local R-tree over ward boundary polygons.

mod boundary;
mod index;
mod wards_api;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{GeoError, Result};

pub use boundary::{load_ward_boundaries, parse_ward_boundaries, WardBoundary};
pub use index::WardBoundaryIndex;
pub use wards_api::WardsApi;

/// A ward containing the searched point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WardMatch {
    #[serde(alias = "ward")]
    pub ward_code: String,
}

#[async_trait]
pub trait PointSearch: Send + Sync {
    /// Search with a `"lat,lon"` formatted point.
    async fn search(&self, point: &str) -> Result<Vec<WardMatch>>;
}

/// Format a point the way [`PointSearch::search`] expects it.
pub fn point_query(longitude: f64, latitude: f64) -> String {
    format!("{},{}", latitude, longitude)
}

/// Parse a `"lat,lon"` query into `(lon, lat)`.
pub fn parse_point_query(point: &str) -> Result<(f64, f64)> {
    let parts: Vec<f64> = point
        .split(',')
        .filter_map(|p| p.trim().parse().ok())
        .collect();
    match parts.as_slice() {
        [lat, lon] => Ok((*lon, *lat)),
        _ => Err(GeoError::PointSearch(format!(
            "expected \"lat,lon\", got {:?}",
            point
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_query_is_lat_first() {
        assert_eq!(point_query(18.42, -33.92), "-33.92,18.42");
    }

    #[test]
    fn test_parse_point_query() {
        assert_eq!(parse_point_query("-33.92, 18.42").unwrap(), (18.42, -33.92));
        assert!(parse_point_query("-33.92").is_err());
        assert!(parse_point_query("north,south").is_err());
    }

    #[test]
    fn test_ward_match_accepts_either_key() {
        let a: WardMatch = serde_json::from_str(r#"{"ward_code": "19100054"}"#).unwrap();
        let b: WardMatch = serde_json::from_str(r#"{"ward": "19100054", "province": "WC"}"#).unwrap();
        assert_eq!(a, b);
    }
}
