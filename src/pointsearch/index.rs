//! R-tree over ward envelopes with exact polygon checks.

use async_trait::async_trait;
use geo::{Contains, Point};
use rstar::primitives::{GeomWithData, Rectangle};
use rstar::RTree;
use tracing::{debug, info};

use super::{parse_point_query, PointSearch, WardBoundary, WardMatch};
use crate::error::Result;

/// Bounding rectangle of a ward, carrying its slot in `WardBoundaryIndex::wards`.
type WardEnvelope = GeomWithData<Rectangle<[f64; 2]>, usize>;

/// Wards searchable by point.
pub struct WardBoundaryIndex {
    wards: Vec<WardBoundary>,
    envelopes: RTree<WardEnvelope>,
}

impl WardBoundaryIndex {
    /// Index `boundaries`. Wards with an empty geometry are dropped.
    pub fn build(boundaries: Vec<WardBoundary>) -> Self {
        let wards: Vec<WardBoundary> = boundaries
            .into_iter()
            .filter(|ward| ward.bbox().is_some())
            .collect();

        let envelopes: Vec<WardEnvelope> = wards
            .iter()
            .enumerate()
            .filter_map(|(slot, ward)| {
                let (min_x, min_y, max_x, max_y) = ward.bbox()?;
                let rect = Rectangle::from_corners([min_x, min_y], [max_x, max_y]);
                Some(GeomWithData::new(rect, slot))
            })
            .collect();

        let index = Self {
            wards,
            envelopes: RTree::bulk_load(envelopes),
        };
        info!("Indexed {} ward boundaries", index.len());
        index
    }

    /// Wards whose polygons contain `(lon, lat)`.
    pub fn wards_at(&self, lon: f64, lat: f64) -> impl Iterator<Item = &WardBoundary> + '_ {
        let point = Point::new(lon, lat);
        self.envelopes
            .locate_all_at_point(&[lon, lat])
            .map(move |envelope| &self.wards[envelope.data])
            .filter(move |ward| ward.geometry.contains(&point))
    }

    pub fn len(&self) -> usize {
        self.wards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wards.is_empty()
    }
}

#[async_trait]
impl PointSearch for WardBoundaryIndex {
    async fn search(&self, point: &str) -> Result<Vec<WardMatch>> {
        let (lon, lat) = parse_point_query(point)?;
        let mut matches: Vec<WardMatch> = self
            .wards_at(lon, lat)
            .map(|ward| WardMatch {
                ward_code: ward.ward_code.clone(),
            })
            .collect();
        // Overlapping wards come back in tree order
        matches.sort_by(|a, b| a.ward_code.cmp(&b.ward_code));

        debug!("{} wards contain ({}, {})", matches.len(), lon, lat);
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{LineString, MultiPolygon, Polygon};

    fn square(code: &str, x: f64, y: f64, size: f64) -> WardBoundary {
        let ring = LineString::from(vec![
            (x, y),
            (x + size, y),
            (x + size, y + size),
            (x, y + size),
            (x, y),
        ]);
        WardBoundary {
            ward_code: code.to_string(),
            geometry: MultiPolygon::new(vec![Polygon::new(ring, vec![])]),
        }
    }

    /// Right triangle filling the lower-right half of its square.
    fn triangle(code: &str, x: f64, y: f64, size: f64) -> WardBoundary {
        let ring = LineString::from(vec![(x, y), (x + size, y), (x + size, y + size), (x, y)]);
        WardBoundary {
            ward_code: code.to_string(),
            geometry: MultiPolygon::new(vec![Polygon::new(ring, vec![])]),
        }
    }

    fn index() -> WardBoundaryIndex {
        WardBoundaryIndex::build(vec![
            square("19100001", 18.0, -34.0, 0.5),
            square("19100002", 18.5, -34.0, 0.5),
        ])
    }

    #[test]
    fn test_finds_containing_ward() {
        let index = index();
        assert_eq!(index.len(), 2);

        let found: Vec<&str> = index
            .wards_at(18.7, -33.8)
            .map(|w| w.ward_code.as_str())
            .collect();
        assert_eq!(found, vec!["19100002"]);
    }

    #[test]
    fn test_outside_all_wards() {
        assert_eq!(index().wards_at(25.0, -30.0).count(), 0);
    }

    #[test]
    fn test_inside_envelope_but_outside_polygon() {
        let index = WardBoundaryIndex::build(vec![triangle("19100003", 0.0, 0.0, 1.0)]);
        assert_eq!(index.wards_at(0.9, 0.1).count(), 1);
        // Upper-left corner is in the bounding box only
        assert_eq!(index.wards_at(0.1, 0.9).count(), 0);
    }

    #[test]
    fn test_empty_geometry_dropped() {
        let index = WardBoundaryIndex::build(vec![
            square("19100001", 18.0, -34.0, 0.5),
            WardBoundary {
                ward_code: "19100009".to_string(),
                geometry: MultiPolygon::new(vec![]),
            },
        ]);
        assert_eq!(index.len(), 1);
    }

    #[tokio::test]
    async fn test_search_uses_lat_lon_order() {
        let index = index();
        let matches = index.search("-33.8,18.2").await.unwrap();
        assert_eq!(
            matches,
            vec![WardMatch {
                ward_code: "19100001".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_empty_index() {
        let index = WardBoundaryIndex::build(vec![]);
        assert!(index.is_empty());
        assert!(index.search("0,0").await.unwrap().is_empty());
    }
}
