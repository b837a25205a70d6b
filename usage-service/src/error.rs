//! Error taxonomy for cost aggregation.

use crate::client::BackendError;
use service_core::error::AppError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UsageError {
    /// The rating backend or region directory could not be reached, or its
    /// client could not be configured. Fails the whole call.
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(#[from] BackendError),

    /// A record in a backend payload is missing or malformed. Logged and
    /// skipped by the pipeline.
    #[error("Data integrity error: {0}")]
    DataIntegrity(String),
}

impl UsageError {
    pub fn kind(&self) -> &'static str {
        match self {
            UsageError::BackendUnavailable(_) => "backend_unavailable",
            UsageError::DataIntegrity(_) => "data_integrity",
        }
    }
}

impl From<UsageError> for AppError {
    fn from(err: UsageError) -> Self {
        match err {
            UsageError::BackendUnavailable(e) => AppError::BadGateway(e.to_string()),
            UsageError::DataIntegrity(msg) => AppError::InternalError(anyhow::anyhow!(msg)),
        }
    }
}
