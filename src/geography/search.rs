//! Geography search by name or code.

use hashbrown::HashMap;
use tracing::debug;

use crate::error::Result;
use crate::models::{serialize_demarcations, Demarcation, GeoLevel, Geography, DEFAULT_YEAR};
use crate::store::{GeoFilter, GeoStore};

/// Maximum results per level query and overall.
pub const SEARCH_LIMIT: usize = 10;

/// Build the match condition for `level` from a trimmed search term.
pub fn level_filter(level: GeoLevel, term: &str) -> GeoFilter {
    match level {
        GeoLevel::Ward => ward_filter(term),
        GeoLevel::Subplace => GeoFilter::Subplace {
            prefix: term.to_string(),
            code: term.to_string(),
        },
        _ => GeoFilter::Name {
            prefix: term.to_string(),
            code: term.to_uppercase(),
        },
    }
}

/// Ward terms are lower-cased and lose a leading or trailing "ward", so that
/// "Ward 5" matches ward number 5 as well as codes starting with "5".
pub fn ward_filter(term: &str) -> GeoFilter {
    let lowered = term.to_lowercase();
    let stripped = strip_ward_word(&lowered);

    GeoFilter::Ward {
        code_prefix: stripped.to_string(),
        // A term that isn't a number simply has no ward-number match
        ward_no: stripped.parse().ok(),
    }
}

fn strip_ward_word(term: &str) -> &str {
    let term = term.trim();
    let term = term.strip_prefix("ward").unwrap_or(term);
    let term = term.strip_suffix("ward").unwrap_or(term);
    term.trim()
}

/// Search geographies by name or code.
///
/// `levels` is a comma-separated list of level names; when absent the
/// country, province, municipality, ward and subplace levels are searched.
/// Subplace matches surface their containing ward. Results are ranked by
/// level and then by name (or code), and at most [`SEARCH_LIMIT`] are
/// returned.
pub async fn search(
    store: &dyn GeoStore,
    term: &str,
    levels: Option<&str>,
    year: Option<&str>,
) -> Result<Vec<Demarcation>> {
    let levels = match levels.filter(|l| !l.trim().is_empty()) {
        Some(names) => GeoLevel::parse_list(names)?,
        None => GeoLevel::default_search_levels().to_vec(),
    };
    let year = year.unwrap_or(DEFAULT_YEAR);
    let term = term.trim();

    let mut session = store.open_session().await?;

    // Keyed on (level, code) so the same record found twice counts once
    let mut found: HashMap<(GeoLevel, String), Geography> = HashMap::new();

    for level in levels {
        let filter = level_filter(level, term);
        let batch = match level {
            GeoLevel::Subplace => {
                session
                    .wards_for_subplaces(&filter, year, SEARCH_LIMIT)
                    .await?
            }
            _ => {
                session
                    .find_matching(level, &filter, year, SEARCH_LIMIT)
                    .await?
            }
        };

        debug!("Search {:?} at {}: {} hits", term, level, batch.len());

        for geo in batch {
            found.entry((geo.level, geo.code.clone())).or_insert(geo);
        }
    }

    let mut ranked: Vec<Geography> = found.into_values().collect();
    ranked.sort_by(|a, b| {
        (a.level.search_rank(), a.display_key(), &a.code).cmp(&(
            b.level.search_rank(),
            b.display_key(),
            &b.code,
        ))
    });
    ranked.truncate(SEARCH_LIMIT);

    Ok(serialize_demarcations(&ranked))
}
