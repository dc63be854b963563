//! Geography lookups: by identifier, by search term and by coordinates.

mod coords;
mod resolve;
mod search;

pub use coords::locations_from_coords;
pub use resolve::{resolve, resolve_in};
pub use search::{level_filter, search, ward_filter, SEARCH_LIMIT};
