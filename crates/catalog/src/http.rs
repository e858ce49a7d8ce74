//! Remote catalog reached over HTTP.
//!
//! Endpoints:
//! - `GET {base}/Search/movie?name=...`  -> one movie record, 404 when unknown
//! - `GET {base}/Search/hybrid?query=...` -> ranked list of movie records

use crate::error::{CatalogError, Result};
use crate::source::MovieCatalog;
use crate::types::MovieRecord;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, instrument};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// `MovieCatalog` backed by a remote search service
#[derive(Debug, Clone)]
pub struct HttpMovieCatalog {
    client: Client,
    base_url: String,
}

impl HttpMovieCatalog {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    /// Use an existing client (shared connection pool)
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/Search/{}", self.base_url, path)
    }
}

#[async_trait]
impl MovieCatalog for HttpMovieCatalog {
    #[instrument(skip(self))]
    async fn lookup_by_name(&self, name: &str) -> Result<Option<MovieRecord>> {
        let response = self
            .client
            .get(self.endpoint("movie"))
            .query(&[("name", name)])
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND || status == StatusCode::NO_CONTENT {
            debug!("Catalog has no movie named {:?}", name);
            return Ok(None);
        }
        if !status.is_success() {
            return Err(CatalogError::Unavailable(format!(
                "lookup returned HTTP {}",
                status
            )));
        }

        let body = response.text().await?;
        if body.trim().is_empty() || body.trim() == "null" {
            return Ok(None);
        }
        let record: MovieRecord = serde_json::from_str(&body)
            .map_err(|e| CatalogError::InvalidResponse(e.to_string()))?;
        Ok(Some(record))
    }

    #[instrument(skip(self))]
    async fn search_similar(&self, query: &str) -> Result<Vec<MovieRecord>> {
        let response = self
            .client
            .get(self.endpoint("hybrid"))
            .query(&[("query", query)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Unavailable(format!(
                "search returned HTTP {}",
                status
            )));
        }

        let records: Vec<MovieRecord> = response.json().await?;
        debug!("Catalog search returned {} records", records.len());
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_is_normalized() {
        let catalog = HttpMovieCatalog::new("http://localhost:5000/api/").unwrap();
        assert_eq!(catalog.base_url(), "http://localhost:5000/api");
        assert_eq!(
            catalog.endpoint("movie"),
            "http://localhost:5000/api/Search/movie"
        );
    }

    #[test]
    fn test_record_accepts_remote_field_names() {
        let json = r#"{"title": "Heat", "plot": "A heist.", "imdbNumber": "tt0113277"}"#;
        let record: MovieRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.name, "Heat");
        assert_eq!(record.id, "tt0113277");
    }

    #[test]
    fn test_record_accepts_pascal_case_fields() {
        let json = r#"{"Name": "Se7en", "Plot": "Two detectives hunt a killer.", "Id": "tt0114369"}"#;
        let record: MovieRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.name, "Se7en");
        assert_eq!(record.plot, "Two detectives hunt a killer.");
        assert_eq!(record.id, "tt0114369");
    }

    #[tokio::test]
    async fn test_unreachable_service_is_unavailable() {
        // Port 9 (discard) on localhost is not expected to serve HTTP
        let catalog =
            HttpMovieCatalog::with_timeout("http://127.0.0.1:9", Duration::from_millis(500))
                .unwrap();
        let err = catalog.lookup_by_name("Heat").await.unwrap_err();
        assert!(matches!(err, CatalogError::Unavailable(_)));
    }
}
