use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use census_geo::models::{Demarcation, Profile};
use census_geo::{GeoError, GeoService};

/// Error response carrying the status derived from a [`GeoError`].
pub struct ApiError(GeoError);

impl From<GeoError> for ApiError {
    fn from(err: GeoError) -> Self {
        ApiError(err)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self.0 {
            GeoError::InvalidLevel(_) => StatusCode::BAD_REQUEST,
            GeoError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self.0);
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

/// Split `level-code` on the first dash. Codes may contain dashes themselves.
fn split_geoid(geoid: &str) -> Result<(&str, &str), GeoError> {
    geoid
        .split_once('-')
        .filter(|(level, code)| !level.is_empty() && !code.is_empty())
        .ok_or_else(|| GeoError::InvalidLevel(geoid.to_string()))
}

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

#[derive(Deserialize)]
pub struct SearchParams {
    q: String,
    levels: Option<String>,
    year: Option<String>,
}

pub async fn search(
    State(service): State<GeoService>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<Demarcation>>, ApiError> {
    let results = service
        .search(&params.q, params.levels.as_deref(), params.year.as_deref())
        .await?;
    Ok(Json(results))
}

#[derive(Deserialize)]
pub struct CoordsParams {
    lat: f64,
    lon: f64,
}

pub async fn coords(
    State(service): State<GeoService>,
    Query(params): Query<CoordsParams>,
) -> Result<Json<Vec<Demarcation>>, ApiError> {
    let results = service.locations_from_coords(params.lon, params.lat).await?;
    Ok(Json(results))
}

pub async fn geography(
    State(service): State<GeoService>,
    Path(geoid): Path<String>,
) -> Result<Json<Demarcation>, ApiError> {
    let (level, code) = split_geoid(&geoid)?;
    let geo = service.resolve(code, level).await?;
    Ok(Json(Demarcation::from(&geo)))
}

pub async fn profile(
    State(service): State<GeoService>,
    Path(geoid): Path<String>,
) -> Result<Json<Profile>, ApiError> {
    let (level, code) = split_geoid(&geoid)?;
    let profile = service.build_profile(code, level).await?;
    Ok(Json(profile))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_geoid() {
        assert_eq!(split_geoid("ward-19100054").unwrap(), ("ward", "19100054"));
        assert_eq!(split_geoid("municipality-WC-033").unwrap(), ("municipality", "WC-033"));
        assert!(split_geoid("ward").is_err());
        assert!(split_geoid("-CPT").is_err());
    }

    #[test]
    fn test_status_mapping() {
        let status = |err: GeoError| ApiError(err).status();
        assert_eq!(status(GeoError::InvalidLevel("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status(GeoError::not_found("ward", "1")), StatusCode::NOT_FOUND);
        assert_eq!(
            status(GeoError::PointSearch("timeout".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
