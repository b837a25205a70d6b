//! Configuration module for usage-service.

use crate::client::{ApiVersion, RatingClientConfig};
use crate::services::history::DEFAULT_MAX_CONCURRENCY;
use secrecy::SecretString;
use service_core::config as core_config;
use service_core::error::AppError;
use service_core::retry::RetryConfig;
use std::collections::HashMap;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct UsageConfig {
    pub common: core_config::Config,
    pub service_name: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub rating: RatingConfig,
    pub regions: RegionSource,
    pub history: HistoryConfig,
}

#[derive(Debug, Clone)]
pub struct RatingConfig {
    pub url: String,
    pub version: ApiVersion,
    pub region_urls: HashMap<String, String>,
    pub auth_token: Option<SecretString>,
    pub request_timeout: Duration,
}

/// Where the list of regions comes from.
#[derive(Debug, Clone)]
pub enum RegionSource {
    Identity { url: String },
    Static(Vec<String>),
}

#[derive(Debug, Clone)]
pub struct HistoryConfig {
    pub cache_enabled: bool,
    pub max_concurrent_requests: usize,
}

impl UsageConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;

        let version = match env::var("RATING_API_VERSION") {
            Ok(raw) => ApiVersion::from_string(&raw).ok_or_else(|| {
                AppError::ConfigError(anyhow::anyhow!(
                    "RATING_API_VERSION must be v1 or v2, got '{raw}'"
                ))
            })?,
            Err(_) => ApiVersion::V2,
        };

        let regions = match env::var("IDENTITY_URL") {
            Ok(url) if !url.trim().is_empty() => RegionSource::Identity { url },
            _ => RegionSource::Static(parse_list(&env::var("REGIONS").unwrap_or_default())),
        };

        Ok(Self {
            common,
            service_name: env::var("SERVICE_NAME")
                .unwrap_or_else(|_| "usage-service".to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok(),
            rating: RatingConfig {
                url: env::var("RATING_API_URL").map_err(|_| {
                    AppError::ConfigError(anyhow::anyhow!("RATING_API_URL is required"))
                })?,
                version,
                region_urls: parse_region_endpoints(
                    &env::var("RATING_REGION_ENDPOINTS").unwrap_or_default(),
                )?,
                auth_token: env::var("RATING_AUTH_TOKEN").ok().map(SecretString::new),
                request_timeout: Duration::from_secs(
                    env::var("RATING_REQUEST_TIMEOUT_SECS")
                        .ok()
                        .and_then(|s| s.parse().ok())
                        .unwrap_or(30),
                ),
            },
            regions,
            history: HistoryConfig {
                cache_enabled: env::var("HISTORY_CACHE_ENABLED")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(true),
                max_concurrent_requests: env::var("MAX_CONCURRENT_REQUESTS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_MAX_CONCURRENCY),
            },
        })
    }

    /// Client settings for the rating backend.
    pub fn rating_client(&self) -> RatingClientConfig {
        RatingClientConfig {
            base_url: self.rating.url.clone(),
            region_urls: self.rating.region_urls.clone(),
            version: self.rating.version,
            auth_token: self.rating.auth_token.clone(),
            request_timeout: self.rating.request_timeout,
            max_concurrency: self.history.max_concurrent_requests,
            retry_config: RetryConfig::default(),
        }
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse `Region=url,Region=url`.
fn parse_region_endpoints(raw: &str) -> Result<HashMap<String, String>, AppError> {
    parse_list(raw)
        .into_iter()
        .map(|pair| match pair.split_once('=') {
            Some((region, url)) if !region.trim().is_empty() && !url.trim().is_empty() => {
                Ok((region.trim().to_string(), url.trim().to_string()))
            }
            _ => Err(AppError::ConfigError(anyhow::anyhow!(
                "RATING_REGION_ENDPOINTS entry '{pair}' is not Region=url"
            ))),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_endpoints_parse() {
        let parsed =
            parse_region_endpoints("RegionOne=http://one:9999, RegionTwo=http://two:9999").unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed["RegionTwo"], "http://two:9999");
        assert!(parse_region_endpoints("").unwrap().is_empty());
        assert!(parse_region_endpoints("RegionOne").is_err());
    }

    #[test]
    fn region_list_skips_blanks() {
        assert_eq!(parse_list("a, b,,c "), vec!["a", "b", "c"]);
    }
}
