//! Client for a remote ward lookup API.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::{PointSearch, WardMatch};
use crate::error::{GeoError, Result};

/// Queries `GET <base>?address=<lat,lon>&database=<database>`, which answers
/// with a JSON array of wards.
pub struct WardsApi {
    client: Client,
    base_url: Url,
    database: String,
}

impl WardsApi {
    pub fn new(base_url: &str, database: &str) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent("census-geo/0.1")
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: Url::parse(base_url)?,
            database: database.to_string(),
        })
    }

    fn request_url(&self, point: &str) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("address", point)
            .append_pair("database", &self.database);
        url
    }
}

#[async_trait]
impl PointSearch for WardsApi {
    async fn search(&self, point: &str) -> Result<Vec<WardMatch>> {
        let url = self.request_url(point);
        debug!("Ward lookup: {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| GeoError::PointSearch(e.to_string()))?;

        // The API answers 404 when no ward contains the point
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GeoError::PointSearch(format!("{}: {}", status, body)));
        }

        response
            .json::<Vec<WardMatch>>()
            .await
            .map_err(|e| GeoError::PointSearch(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_url() {
        let api = WardsApi::new("https://wards.example.org/", "wards_2011").unwrap();
        let url = api.request_url("-33.92,18.42");
        assert_eq!(
            url.as_str(),
            "https://wards.example.org/?address=-33.92%2C18.42&database=wards_2011"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(WardsApi::new("not a url", "wards_2011").is_err());
    }
}
