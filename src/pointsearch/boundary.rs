//! Ward boundary extraction from GeoJSON.

use anyhow::{bail, Context, Result};
use geo::{BoundingRect, Coord, LineString, MultiPolygon, Polygon};
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info};

/// A single ward polygon with its code
#[derive(Debug, Clone)]
pub struct WardBoundary {
    pub ward_code: String,
    pub geometry: MultiPolygon<f64>,
}

impl WardBoundary {
    /// Get the bounding box of this boundary
    pub fn bbox(&self) -> Option<(f64, f64, f64, f64)> {
        self.geometry
            .bounding_rect()
            .map(|rect| (rect.min().x, rect.min().y, rect.max().x, rect.max().y))
    }
}

/// Load ward boundaries from a GeoJSON FeatureCollection file.
///
/// The ward code is read from the `code_property` feature property.
pub fn load_ward_boundaries(path: &Path, code_property: &str) -> Result<Vec<WardBoundary>> {
    info!("Loading ward boundaries from {}", path.display());
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let collection: Value = serde_json::from_str(&content).context("Invalid GeoJSON")?;
    parse_ward_boundaries(&collection, code_property)
}

/// Extract ward boundaries from a parsed FeatureCollection.
///
/// Features without a code or a usable Polygon / MultiPolygon geometry are
/// skipped.
pub fn parse_ward_boundaries(collection: &Value, code_property: &str) -> Result<Vec<WardBoundary>> {
    if collection["type"] != "FeatureCollection" {
        bail!("Expected a GeoJSON FeatureCollection");
    }
    let features = collection["features"]
        .as_array()
        .context("FeatureCollection has no features array")?;

    let mut boundaries = Vec::with_capacity(features.len());

    for feature in features {
        let ward_code = match &feature["properties"][code_property] {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => {
                debug!("Skipping feature without {}", code_property);
                continue;
            }
        };

        match parse_geometry(&feature["geometry"]) {
            Some(geometry) => boundaries.push(WardBoundary {
                ward_code,
                geometry,
            }),
            None => debug!("Could not resolve geometry for ward {}", ward_code),
        }
    }

    info!("Found {} ward boundaries", boundaries.len());
    Ok(boundaries)
}

fn parse_geometry(geometry: &Value) -> Option<MultiPolygon<f64>> {
    let coordinates = geometry["coordinates"].as_array()?;
    let polygons: Vec<Polygon<f64>> = match geometry["type"].as_str()? {
        "Polygon" => vec![parse_polygon(coordinates)?],
        "MultiPolygon" => coordinates
            .iter()
            .filter_map(|p| parse_polygon(p.as_array()?))
            .collect(),
        _ => return None,
    };

    if polygons.is_empty() {
        return None;
    }
    Some(MultiPolygon::new(polygons))
}

/// First ring is the exterior, the rest are holes.
fn parse_polygon(rings: &[Value]) -> Option<Polygon<f64>> {
    let mut rings = rings.iter().filter_map(|r| parse_ring(r.as_array()?));
    let exterior = rings.next()?;
    Some(Polygon::new(exterior, rings.collect()))
}

fn parse_ring(positions: &[Value]) -> Option<LineString<f64>> {
    let mut ring: Vec<Coord<f64>> = positions
        .iter()
        .filter_map(|p| {
            let p = p.as_array()?;
            Some(Coord {
                x: p.first()?.as_f64()?,
                y: p.get(1)?.as_f64()?,
            })
        })
        .collect();

    if ring.len() < 3 {
        return None;
    }

    // Close the ring if needed
    if ring.first() != ring.last() {
        ring.push(ring[0]);
    }

    if ring.len() < 4 {
        return None;
    }

    Some(LineString::new(ring))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_polygon_and_multipolygon() {
        let collection = json!({
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "properties": {"ward_code": "19100054"},
                    "geometry": {
                        "type": "Polygon",
                        "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0]]]
                    }
                },
                {
                    "type": "Feature",
                    "properties": {"ward_code": 19100055},
                    "geometry": {
                        "type": "MultiPolygon",
                        "coordinates": [
                            [[[2.0, 0.0], [3.0, 0.0], [3.0, 1.0]]],
                            [[[4.0, 0.0], [5.0, 0.0], [5.0, 1.0], [4.0, 0.0]]]
                        ]
                    }
                }
            ]
        });

        let boundaries = parse_ward_boundaries(&collection, "ward_code").unwrap();
        assert_eq!(boundaries.len(), 2);
        assert_eq!(boundaries[0].ward_code, "19100054");
        assert_eq!(boundaries[1].ward_code, "19100055");
        assert_eq!(boundaries[1].geometry.0.len(), 2);
        assert_eq!(boundaries[0].bbox(), Some((0.0, 0.0, 1.0, 1.0)));
    }

    #[test]
    fn test_open_ring_is_closed() {
        let ring = parse_ring(&[json!([0.0, 0.0]), json!([1.0, 0.0]), json!([1.0, 1.0])]).unwrap();
        assert_eq!(ring.0.len(), 4);
        assert_eq!(ring.0.first(), ring.0.last());
    }

    #[test]
    fn test_degenerate_ring_rejected() {
        assert!(parse_ring(&[json!([0.0, 0.0]), json!([1.0, 0.0])]).is_none());
    }

    #[test]
    fn test_skips_features_without_code_or_geometry() {
        let collection = json!({
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": {}, "geometry": null},
                {
                    "type": "Feature",
                    "properties": {"WardID": "1"},
                    "geometry": {"type": "Point", "coordinates": [0.0, 0.0]}
                }
            ]
        });
        let boundaries = parse_ward_boundaries(&collection, "WardID").unwrap();
        assert!(boundaries.is_empty());
    }

    #[test]
    fn test_rejects_non_collection() {
        assert!(parse_ward_boundaries(&json!({"type": "Feature"}), "ward_code").is_err());
    }
}
