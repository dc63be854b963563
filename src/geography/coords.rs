use tracing::{debug, info};

use crate::error::Result;
use crate::models::{serialize_demarcations, Demarcation, GeoLevel, DEFAULT_YEAR};
use crate::pointsearch::{point_query, PointSearch};
use crate::store::GeoStore;

/// Ancestors reported after the ward, narrowest first.
const WARD_ANCESTORS: [GeoLevel; 3] = [
    GeoLevel::Municipality,
    GeoLevel::Province,
    GeoLevel::Country,
];

/// Find the ward containing a point, followed by its municipality, province
/// and country.
///
/// Returns an empty list when no ward contains the point or the ward isn't in
/// the store. Ancestors that can't be found are left out.
pub async fn locations_from_coords(
    store: &dyn GeoStore,
    point_search: &dyn PointSearch,
    longitude: f64,
    latitude: f64,
) -> Result<Vec<Demarcation>> {
    let candidates = point_search
        .search(&point_query(longitude, latitude))
        .await?;

    // Wards don't overlap, so there should be at most one
    let Some(location) = candidates.first() else {
        debug!("No ward contains ({}, {})", longitude, latitude);
        return Ok(Vec::new());
    };

    let mut session = store.open_session().await?;

    let Some(ward) = session
        .geography(GeoLevel::Ward, &location.ward_code, DEFAULT_YEAR)
        .await?
    else {
        info!("Ward {} from point search is not in the store", location.ward_code);
        return Ok(Vec::new());
    };

    let mut chain = Vec::with_capacity(1 + WARD_ANCESTORS.len());
    for level in WARD_ANCESTORS {
        let Some(code) = ward.parents.code_at(level) else {
            continue;
        };
        if let Some(parent) = session.geography(level, code, &ward.year).await? {
            chain.push(parent);
        }
    }
    chain.insert(0, ward);

    Ok(serialize_demarcations(&chain))
}
