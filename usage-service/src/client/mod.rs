//! Rating backend and region directory clients.
//!
//! The core consumes these only through [`RatingBackend`] and
//! [`RegionDirectory`]; protocol versions are adapters behind the same trait.

mod http;
mod payload;
mod regions;

pub use http::{ApiVersion, HttpRatingBackend, RatingClientConfig};
pub use payload::{
    CategoryPayload, InvoiceListing, InvoicePayload, LinePayload, QuotationListing, RatedResource,
    RatedService, RatedUsage, RatedUsageResponse,
};
pub use regions::{HttpRegionDirectory, StaticRegionDirectory};

use crate::models::CreditsResponse;
use async_trait::async_trait;
use chrono::NaiveDate;
use service_core::retry::Retryable;
use std::collections::BTreeMap;
use thiserror::Error;

/// Failure talking to an external collaborator.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("transport error during {operation}: {source}")]
    Transport {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{operation} returned HTTP {status}: {body}")]
    Status {
        operation: &'static str,
        status: u16,
        body: String,
    },

    #[error("failed to decode {operation} response: {source}")]
    Decode {
        operation: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl Retryable for BackendError {
    fn is_retryable(&self) -> bool {
        match self {
            BackendError::Transport { source, .. } => !source.is_builder(),
            BackendError::Status { status, .. } => *status == 429 || *status >= 500,
            BackendError::Decode { .. } | BackendError::Configuration(_) => false,
        }
    }
}

/// Source of invoices, quotations and credits.
#[async_trait]
pub trait RatingBackend: Send + Sync {
    /// Identity of the backend endpoint, used to scope cached months.
    fn endpoint(&self) -> &str;

    /// Closed-month invoices in `[start, end)`, keyed by invoice date string.
    async fn list_invoices(
        &self,
        tenant_id: &str,
        start: NaiveDate,
        end: NaiveDate,
        detailed: bool,
    ) -> Result<BTreeMap<String, InvoicePayload>, BackendError>;

    /// Live-month quotations as seen from one region, keyed by date string.
    /// `today` fixes the month being quoted.
    async fn list_quotations(
        &self,
        tenant_id: &str,
        region: &str,
        today: NaiveDate,
    ) -> Result<BTreeMap<String, InvoicePayload>, BackendError>;

    async fn list_credits(&self, tenant_id: &str) -> Result<CreditsResponse, BackendError>;
}

/// Lists the regions whose usage is aggregated.
#[async_trait]
pub trait RegionDirectory: Send + Sync {
    async fn list_regions(&self) -> Result<Vec<String>, BackendError>;
}
