use crate::error::Result;
use crate::geography::resolve_in;
use crate::models::GeoLevel;
use crate::store::GeoSession;

/// Ancestor geographies whose figures accompany a profile.
///
/// Countries have none, provinces are compared with their country, and every
/// other level with its province and country. References missing from the
/// record are skipped.
pub async fn summary_levels(
    session: &mut dyn GeoSession,
    level: GeoLevel,
    code: &str,
) -> Result<Vec<(GeoLevel, String)>> {
    let wanted: &[GeoLevel] = match level {
        GeoLevel::Country => return Ok(Vec::new()),
        GeoLevel::Province => &[GeoLevel::Country],
        _ => &[GeoLevel::Province, GeoLevel::Country],
    };

    let geo = resolve_in(session, level, code).await?;

    Ok(wanted
        .iter()
        .filter_map(|l| Some((*l, geo.parents.code_at(*l)?.to_string())))
        .collect())
}
