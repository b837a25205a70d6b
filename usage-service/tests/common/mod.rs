#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use service_core::config::Config as CoreConfig;
use std::collections::{BTreeMap, HashMap};
use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use usage_service::client::{
    ApiVersion, BackendError, InvoicePayload, RatingBackend, RegionDirectory,
    StaticRegionDirectory,
};
use usage_service::config::{HistoryConfig, RatingConfig, RegionSource, UsageConfig};
use usage_service::models::CreditsResponse;
use usage_service::services::HistoryAssembler;
use usage_service::startup::Application;

pub const TEST_TENANT: &str = "093551df28e545eba9ba676dbd56bfa7";

/// In-memory rating backend that counts calls.
#[derive(Default)]
pub struct FakeRatingBackend {
    invoices: Mutex<BTreeMap<String, InvoicePayload>>,
    quotations: Mutex<HashMap<String, BTreeMap<String, InvoicePayload>>>,
    credits: Mutex<CreditsResponse>,
    failing: AtomicBool,
    pub invoice_calls: AtomicUsize,
    pub quotation_calls: AtomicUsize,
}

impl FakeRatingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_invoices(self, invoices: serde_json::Value) -> Self {
        *self.invoices.lock().unwrap() = serde_json::from_value(invoices).unwrap();
        self
    }

    pub fn with_quotation(self, region: &str, quotations: serde_json::Value) -> Self {
        self.quotations
            .lock()
            .unwrap()
            .insert(region.to_string(), serde_json::from_value(quotations).unwrap());
        self
    }

    pub fn with_credits(self, credits: serde_json::Value) -> Self {
        *self.credits.lock().unwrap() = serde_json::from_value(credits).unwrap();
        self
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn invoice_calls(&self) -> usize {
        self.invoice_calls.load(Ordering::SeqCst)
    }

    pub fn quotation_calls(&self) -> usize {
        self.quotation_calls.load(Ordering::SeqCst)
    }

    fn check(&self, operation: &'static str) -> Result<(), BackendError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(BackendError::Status {
                operation,
                status: 503,
                body: "rating backend is down".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl RatingBackend for FakeRatingBackend {
    fn endpoint(&self) -> &str {
        "fake://rating"
    }

    async fn list_invoices(
        &self,
        _tenant_id: &str,
        _start: NaiveDate,
        _end: NaiveDate,
        _detailed: bool,
    ) -> Result<BTreeMap<String, InvoicePayload>, BackendError> {
        self.invoice_calls.fetch_add(1, Ordering::SeqCst);
        self.check("list_invoices")?;
        Ok(self.invoices.lock().unwrap().clone())
    }

    async fn list_quotations(
        &self,
        _tenant_id: &str,
        region: &str,
        _today: NaiveDate,
    ) -> Result<BTreeMap<String, InvoicePayload>, BackendError> {
        self.quotation_calls.fetch_add(1, Ordering::SeqCst);
        self.check("list_quotations")?;
        Ok(self
            .quotations
            .lock()
            .unwrap()
            .get(region)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_credits(&self, _tenant_id: &str) -> Result<CreditsResponse, BackendError> {
        self.check("list_credits")?;
        Ok(self.credits.lock().unwrap().clone())
    }
}

/// Region directory that always fails.
pub struct UnreachableRegions;

#[async_trait]
impl RegionDirectory for UnreachableRegions {
    async fn list_regions(&self) -> Result<Vec<String>, BackendError> {
        Err(BackendError::Status {
            operation: "list_regions",
            status: 502,
            body: "identity unavailable".to_string(),
        })
    }
}

pub fn regions(names: &[&str]) -> Arc<dyn RegionDirectory> {
    Arc::new(StaticRegionDirectory::new(
        names.iter().map(|s| s.to_string()).collect(),
    ))
}

/// Closed-month invoices as the backend lists them for July 2017.
pub fn invoices() -> serde_json::Value {
    serde_json::json!({
        "2016-08-31": {"total_cost": 689.0, "status": "paid", "details": {
            "Network": {"total_cost": 689.0, "breakdown": {"NZ.n1.network": [
                {"cost": 689.0, "quantity": 68900, "rate": 0.01,
                 "resource_id": "8", "resource_name": "my_network", "unit": "hour"}
            ]}}
        }},
        "2016-09-30": {"total_cost": 653.0, "status": "paid"},
        "2017-03-31": {"total_cost": 617.0, "status": "paid"}
    })
}

pub fn region_one_quotation() -> serde_json::Value {
    serde_json::json!({"2017-07-10": {"total_cost": 45.5, "details": {
        "Network": {"total_cost": 2, "breakdown": {"NZ.o1.standard": [
            {"cost": 2, "quantity": 200, "rate": 0.01,
             "resource_id": "8", "resource_name": "my_network", "unit": "hour"}
        ]}},
        "Object Storage": {"total_cost": 13.5, "breakdown": {"NZ.o1.standard": [
            {"cost": 13.5, "quantity": 50000.0, "rate": 0.00027,
             "resource_id": "1", "resource_name": "my_container", "unit": "gigabyte"}
        ]}},
        "Virtual Machine": {"total_cost": 30.0, "breakdown": {"REGIONONE.b1.standard": [
            {"cost": 15.0, "quantity": 30000.0, "rate": 0.0005,
             "resource_id": "2", "resource_name": "my_instance", "unit": "second"},
            {"cost": 15.0, "quantity": 30000.0, "rate": 0.0005,
             "resource_id": "3", "resource_name": "other_instance", "unit": "second"}
        ]}}
    }}})
}

pub fn region_two_quotation() -> serde_json::Value {
    serde_json::json!({"2017-07-10": {"total_cost": 28.5, "details": {
        "Object Storage": {"total_cost": 13.5, "breakdown": {"REGIONONE.o1.standard": [
            {"cost": 13.5, "quantity": 50000.0, "rate": 0.00027,
             "resource_id": "1", "resource_name": "my_container", "unit": "gigabyte"}
        ]}},
        "Virtual Machine": {"total_cost": 15.0, "breakdown": {"REGIONONE.b1.standard": [
            {"cost": 15.0, "quantity": 30000.0, "rate": 0.0005,
             "resource_id": "22", "resource_name": "new_instance", "unit": "second"}
        ]}}
    }}})
}

pub fn test_config() -> UsageConfig {
    UsageConfig {
        common: CoreConfig {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 0,
        },
        service_name: "usage-service-test".to_string(),
        log_level: "info".to_string(),
        otlp_endpoint: None,
        rating: RatingConfig {
            url: "http://127.0.0.1:1".to_string(),
            version: ApiVersion::V2,
            region_urls: HashMap::new(),
            auth_token: None,
            request_timeout: Duration::from_secs(5),
        },
        regions: RegionSource::Static(vec!["RegionOne".to_string()]),
        history: HistoryConfig {
            cache_enabled: true,
            max_concurrent_requests: 4,
        },
    }
}

pub struct TestApp {
    pub http_address: String,
    pub http_port: u16,
}

impl TestApp {
    /// Spawn the HTTP application around `assembler` on a random port.
    pub async fn spawn(assembler: HistoryAssembler) -> Self {
        let app = Application::build_with(test_config(), assembler)
            .await
            .expect("Failed to build test application");

        let http_port = app.http_port();
        let http_address = format!("http://127.0.0.1:{}", http_port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        let client = reqwest::Client::new();
        let health_url = format!("{}/health", http_address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        TestApp {
            http_address,
            http_port,
        }
    }
}
