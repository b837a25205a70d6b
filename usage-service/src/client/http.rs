//! HTTP adapter for the rating backend.
//!
//! Both protocol versions sit behind [`RatingBackend`]: v2 serves invoices and
//! quotations directly, v1 serves raw rated usage per period which is
//! regrouped into the same invoice shape.

use super::{
    BackendError, InvoiceListing, InvoicePayload, QuotationListing, RatedUsageResponse,
    RatingBackend,
};
use crate::models::CreditsResponse;
use crate::services::calendar::{first_of_month, next_month};
use crate::services::metrics::{record_backend_request, record_backend_request_duration};
use async_trait::async_trait;
use chrono::NaiveDate;
use futures::stream::{self, StreamExt, TryStreamExt};
use reqwest::header::HeaderValue;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use service_core::middleware::tracing::{current_request_id, REQUEST_ID_HEADER};
use service_core::observability::inject_trace_context;
use service_core::retry::{retry_call, RetryConfig};
use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};
use tracing::{info, instrument};

const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

/// Rating API protocol version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiVersion {
    V1,
    V2,
}

impl ApiVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiVersion::V1 => "v1",
            ApiVersion::V2 => "v2",
        }
    }

    pub fn from_string(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1" | "v1" => Some(ApiVersion::V1),
            "2" | "v2" => Some(ApiVersion::V2),
            _ => None,
        }
    }
}

/// Configuration for the rating backend client.
#[derive(Clone, Debug)]
pub struct RatingClientConfig {
    /// Default endpoint, also used for invoices and credits.
    pub base_url: String,
    /// Per-region endpoint overrides for quotations.
    pub region_urls: HashMap<String, String>,
    pub version: ApiVersion,
    pub auth_token: Option<SecretString>,
    /// Request timeout. The core enforces none of its own.
    pub request_timeout: Duration,
    /// Cap on concurrent per-month requests (v1 only).
    pub max_concurrency: usize,
    pub retry_config: RetryConfig,
}

impl Default for RatingClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9999".to_string(),
            region_urls: HashMap::new(),
            version: ApiVersion::V2,
            auth_token: None,
            request_timeout: Duration::from_secs(30),
            max_concurrency: 12,
            retry_config: RetryConfig::default(),
        }
    }
}

/// GET a JSON document, retrying transient failures.
pub(crate) async fn fetch_json<T: DeserializeOwned>(
    client: &Client,
    url: &str,
    query: &[(&str, String)],
    auth_token: Option<&SecretString>,
    retry_config: &RetryConfig,
    operation: &'static str,
) -> Result<T, BackendError> {
    let started = Instant::now();
    let result = retry_call(retry_config, operation, || {
        send_once(client, url, query, auth_token, operation)
    })
    .await;

    record_backend_request_duration(operation, started.elapsed().as_secs_f64());
    record_backend_request(operation, if result.is_ok() { "success" } else { "error" });

    result
}

async fn send_once<T: DeserializeOwned>(
    client: &Client,
    url: &str,
    query: &[(&str, String)],
    auth_token: Option<&SecretString>,
    operation: &'static str,
) -> Result<T, BackendError> {
    let mut headers = reqwest::header::HeaderMap::new();
    inject_trace_context(&mut headers);
    let request_id = current_request_id().and_then(|id| id.parse::<HeaderValue>().ok());
    if let Some(value) = request_id {
        headers.insert(REQUEST_ID_HEADER, value);
    }

    let mut request = client.get(url).headers(headers).query(query);
    if let Some(token) = auth_token {
        request = request.header(AUTH_TOKEN_HEADER, token.expose_secret().as_str());
    }

    let response = request
        .send()
        .await
        .map_err(|source| BackendError::Transport { operation, source })?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|source| BackendError::Transport { operation, source })?;

    tracing::debug!(operation, status = %status, "Backend response received");

    if !status.is_success() {
        return Err(BackendError::Status {
            operation,
            status: status.as_u16(),
            body,
        });
    }

    serde_json::from_str(&body).map_err(|source| BackendError::Decode { operation, source })
}

/// Rating backend reached over HTTP.
#[derive(Clone)]
pub struct HttpRatingBackend {
    client: Client,
    config: RatingClientConfig,
}

impl HttpRatingBackend {
    pub fn new(config: RatingClientConfig) -> Result<Self, BackendError> {
        if config.base_url.trim().is_empty() {
            return Err(BackendError::Configuration(
                "rating backend URL is empty".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| BackendError::Configuration(format!("failed to build HTTP client: {e}")))?;

        info!(
            base_url = %config.base_url,
            version = config.version.as_str(),
            region_overrides = config.region_urls.len(),
            "Rating backend client configured"
        );

        Ok(Self { client, config })
    }

    fn url_for_region(&self, region: Option<&str>) -> &str {
        region
            .and_then(|r| self.config.region_urls.get(r))
            .map(String::as_str)
            .unwrap_or(&self.config.base_url)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        base_url: &str,
        path: &str,
        query: &[(&str, String)],
        operation: &'static str,
    ) -> Result<T, BackendError> {
        let url = format!("{}{}", base_url.trim_end_matches('/'), path);
        fetch_json(
            &self.client,
            &url,
            query,
            self.config.auth_token.as_ref(),
            &self.config.retry_config,
            operation,
        )
        .await
    }

    async fn rated_usage(
        &self,
        base_url: &str,
        tenant_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<RatedUsageResponse, BackendError> {
        let query = [
            ("tenant_id", tenant_id.to_string()),
            ("start", start.format("%Y-%m-%dT00:00:00").to_string()),
            ("end", end.format("%Y-%m-%dT00:00:00").to_string()),
        ];
        self.get(base_url, "/v1/usage", &query, "get_rated_usage")
            .await
    }

    /// v1 has no invoice listing; rate each closed month separately.
    async fn rated_months(
        &self,
        tenant_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<BTreeMap<String, InvoicePayload>, BackendError> {
        let mut months = Vec::new();
        let mut month = first_of_month(start);
        while month < end {
            let next = next_month(month);
            months.push((month, next));
            month = next;
        }

        let backend = self.clone();
        let tenant = tenant_id.to_string();
        let rated: Vec<(NaiveDate, RatedUsageResponse)> = stream::iter(months)
            .map(move |(month_start, month_end)| {
                let backend = backend.clone();
                let tenant = tenant.clone();
                async move {
                    let usage = backend
                        .rated_usage(&backend.config.base_url, &tenant, month_start, month_end)
                        .await?;
                    Ok::<_, BackendError>((month_start, usage))
                }
            })
            .buffered(self.config.max_concurrency.max(1))
            .try_collect()
            .await?;

        Ok(rated
            .into_iter()
            .filter(|(_, rated)| !rated.usage.resources.is_empty())
            .map(|(month_start, rated)| {
                (
                    month_start.format("%Y-%m-%d").to_string(),
                    rated.usage.into_invoice(),
                )
            })
            .collect())
    }
}

#[async_trait]
impl RatingBackend for HttpRatingBackend {
    fn endpoint(&self) -> &str {
        &self.config.base_url
    }

    #[instrument(skip(self))]
    async fn list_invoices(
        &self,
        tenant_id: &str,
        start: NaiveDate,
        end: NaiveDate,
        detailed: bool,
    ) -> Result<BTreeMap<String, InvoicePayload>, BackendError> {
        match self.config.version {
            ApiVersion::V2 => {
                let query = [
                    ("project_id", tenant_id.to_string()),
                    ("start", start.format("%Y-%m-%d").to_string()),
                    ("end", end.format("%Y-%m-%d").to_string()),
                    ("detailed", detailed.to_string()),
                ];
                let listing: InvoiceListing = self
                    .get(&self.config.base_url, "/v2/invoices", &query, "list_invoices")
                    .await?;
                Ok(listing.invoices)
            }
            ApiVersion::V1 => self.rated_months(tenant_id, start, end).await,
        }
    }

    #[instrument(skip(self))]
    async fn list_quotations(
        &self,
        tenant_id: &str,
        region: &str,
        today: NaiveDate,
    ) -> Result<BTreeMap<String, InvoicePayload>, BackendError> {
        let base_url = self.url_for_region(Some(region));
        match self.config.version {
            ApiVersion::V2 => {
                let query = [
                    ("project_id", tenant_id.to_string()),
                    ("detailed", "true".to_string()),
                ];
                let listing: QuotationListing = self
                    .get(base_url, "/v2/quotations", &query, "list_quotations")
                    .await?;
                Ok(listing.quotations)
            }
            ApiVersion::V1 => {
                let start = first_of_month(today);
                let rated = self
                    .rated_usage(base_url, tenant_id, start, next_month(start))
                    .await?;
                let mut quotations = BTreeMap::new();
                quotations.insert(
                    today.format("%Y-%m-%d").to_string(),
                    rated.usage.into_invoice(),
                );
                Ok(quotations)
            }
        }
    }

    #[instrument(skip(self))]
    async fn list_credits(&self, tenant_id: &str) -> Result<CreditsResponse, BackendError> {
        match self.config.version {
            ApiVersion::V2 => {
                let query = [("project_id", tenant_id.to_string())];
                self.get(&self.config.base_url, "/v2/credits", &query, "list_credits")
                    .await
            }
            ApiVersion::V1 => {
                tracing::debug!("Credits are not served by the v1 rating API");
                Ok(CreditsResponse::default())
            }
        }
    }
}
