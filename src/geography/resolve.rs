use tracing::debug;

use crate::error::{GeoError, Result};
use crate::models::{GeoLevel, Geography, DEFAULT_YEAR};
use crate::store::{GeoSession, GeoStore};

/// Get the geography for `level` and `code`.
///
/// Fails with `InvalidLevel` for an unknown level name and `NotFound` when no
/// record exists for the default year.
pub async fn resolve(store: &dyn GeoStore, code: &str, level: &str) -> Result<Geography> {
    let level: GeoLevel = level.parse()?;
    let mut session = store.open_session().await?;
    resolve_in(session.as_mut(), level, code).await
}

/// Like [`resolve`], inside an already open session.
pub async fn resolve_in(
    session: &mut dyn GeoSession,
    level: GeoLevel,
    code: &str,
) -> Result<Geography> {
    debug!("Resolving {}-{}", level, code);
    session
        .geography(level, code, DEFAULT_YEAR)
        .await?
        .ok_or_else(|| GeoError::not_found(level, code))
}
