//! Region directory adapters.

use super::http::fetch_json;
use super::{BackendError, RegionDirectory};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::SecretString;
use serde::Deserialize;
use service_core::retry::RetryConfig;
use std::time::Duration;

/// Fixed region list taken from configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticRegionDirectory {
    regions: Vec<String>,
}

impl StaticRegionDirectory {
    pub fn new(regions: Vec<String>) -> Self {
        Self { regions }
    }
}

#[async_trait]
impl RegionDirectory for StaticRegionDirectory {
    async fn list_regions(&self) -> Result<Vec<String>, BackendError> {
        Ok(self.regions.clone())
    }
}

#[derive(Debug, Deserialize)]
struct RegionListing {
    #[serde(default)]
    regions: Vec<RegionEntry>,
}

#[derive(Debug, Deserialize)]
struct RegionEntry {
    id: String,
}

/// Region list served by the identity service (`GET /v3/regions`).
#[derive(Clone)]
pub struct HttpRegionDirectory {
    client: Client,
    identity_url: String,
    auth_token: Option<SecretString>,
    retry_config: RetryConfig,
}

impl HttpRegionDirectory {
    pub fn new(
        identity_url: &str,
        auth_token: Option<SecretString>,
        request_timeout: Duration,
    ) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| BackendError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            identity_url: identity_url.trim_end_matches('/').to_string(),
            auth_token,
            retry_config: RetryConfig::quick(),
        })
    }
}

#[async_trait]
impl RegionDirectory for HttpRegionDirectory {
    async fn list_regions(&self) -> Result<Vec<String>, BackendError> {
        let url = format!("{}/v3/regions", self.identity_url);
        let listing: RegionListing = fetch_json(
            &self.client,
            &url,
            &[],
            self.auth_token.as_ref(),
            &self.retry_config,
            "list_regions",
        )
        .await?;

        Ok(listing.regions.into_iter().map(|r| r.id).collect())
    }
}
