//! Map search and place details through SerpAPI's Google Maps engine.

pub mod cache;
pub mod error;
pub mod serpapi;
pub mod types;

use std::time::Duration;

use serde_json::Value;

use crate::config::PlacesConfig;

pub use cache::PlacesCache;
pub use error::{PlacesError, PlacesResult};
pub use types::{PlaceDetail, PlaceSummary};

/// Place lookups with a TTL cache in front of the backend.
pub struct PlacesService {
    config: PlacesConfig,
    client: reqwest::Client,
    cache: PlacesCache,
}

impl PlacesService {
    /// Build the service.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: PlacesConfig) -> PlacesResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .gzip(true)
            .build()?;
        let cache = PlacesCache::new(
            Duration::from_secs(config.cache_ttl_seconds),
            config.cache_max_entries,
        );
        Ok(Self {
            config,
            client,
            cache,
        })
    }

    /// Whether an API key is configured.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.api_key().is_ok()
    }

    fn api_key(&self) -> PlacesResult<&str> {
        self.config
            .serpapi_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| PlacesError::ApiKeyRequired("SerpAPI".to_string()))
    }

    async fn query(&self, params: &[(&str, &str)]) -> PlacesResult<Value> {
        let api_key = self.api_key()?;
        let response = self
            .client
            .get(&self.config.base_url)
            .query(&[
                ("engine", serpapi::ENGINE),
                ("hl", self.config.language.as_str()),
                ("gl", self.config.region.as_str()),
                ("api_key", api_key),
            ])
            .query(params)
            .send()
            .await
            .map_err(|e| PlacesError::HttpRequest(e.without_url()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PlacesError::HttpRequest(e.without_url()))?;
        let json: Value = serde_json::from_str(&body).map_err(|e| {
            if status.is_success() {
                PlacesError::JsonParse(e)
            } else {
                PlacesError::Status(status.as_u16())
            }
        })?;
        serpapi::check_error(&json)?;
        if !status.is_success() {
            return Err(PlacesError::Status(status.as_u16()));
        }
        Ok(json)
    }

    /// Search places; an empty query uses the configured default.
    ///
    /// # Errors
    /// Returns an error if no key is configured or the backend fails.
    pub async fn search(&self, query: Option<&str>) -> PlacesResult<Vec<PlaceSummary>> {
        let query = query
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .unwrap_or(&self.config.default_query);
        self.api_key()?;

        if let Some(cached) = self.cache.get_search(query) {
            tracing::debug!(query, "Place search cache hit");
            return Ok(cached);
        }

        let json = self.query(&[("q", query)]).await?;
        let results = serpapi::parse_search_results(&json);
        tracing::info!(query, count = results.len(), "Place search completed");
        self.cache.set_search(query, &results);
        Ok(results)
    }

    /// Detail card for a place; `name` is used when the backend has no
    /// title, falling back to the default query.
    ///
    /// # Errors
    /// Returns an error if no key is configured or the backend fails.
    pub async fn detail(
        &self,
        place_id: Option<&str>,
        name: Option<&str>,
    ) -> PlacesResult<PlaceDetail> {
        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.config.default_query);
        self.api_key()?;

        let Some(place_id) = place_id.map(str::trim).filter(|id| !id.is_empty()) else {
            return Ok(serpapi::parse_place_detail(&Value::Null, name));
        };

        if let Some(cached) = self.cache.get_detail(place_id) {
            return Ok(cached);
        }

        let json = self.query(&[("place_id", place_id)]).await?;
        let detail = serpapi::parse_place_detail(&json, name);
        self.cache.set_detail(place_id, &detail);
        Ok(detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_key_is_unconfigured() {
        let service = PlacesService::new(PlacesConfig {
            serpapi_key: Some("  ".to_string()),
            ..PlacesConfig::default()
        })
        .unwrap();
        assert!(!service.is_configured());

        let err = service.search(Some("Phở")).await.unwrap_err();
        assert!(err.is_unconfigured());
        let err = service.detail(Some("ChIJ1"), None).await.unwrap_err();
        assert!(err.is_unconfigured());
    }

    #[tokio::test]
    async fn test_detail_without_place_id_uses_name() {
        let service = PlacesService::new(PlacesConfig {
            serpapi_key: Some("test-key".to_string()),
            ..PlacesConfig::default()
        })
        .unwrap();
        let detail = service.detail(None, Some("Đà Lạt")).await.unwrap();
        assert_eq!(detail.name, "Đà Lạt");
    }
}
