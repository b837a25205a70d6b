mod common;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use common::{
    invoices, region_one_quotation, region_two_quotation, regions, FakeRatingBackend,
    UnreachableRegions, TEST_TENANT,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use usage_service::error::UsageError;
use usage_service::models::{Category, InvoiceStatus, ALL_REGIONS};
use usage_service::services::{HistoryAssembler, InMemoryMonthCache, MonthCache};

fn july_tenth() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2017, 7, 10, 0, 0, 0).unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn single_region_backend() -> Arc<FakeRatingBackend> {
    Arc::new(
        FakeRatingBackend::new()
            .with_invoices(invoices())
            .with_quotation("RegionOne", region_one_quotation()),
    )
}

#[tokio::test]
async fn history_covers_twelve_months_oldest_first() {
    let backend = single_region_backend();
    let assembler = HistoryAssembler::new(backend.clone(), regions(&["RegionOne"]));

    let months = assembler
        .compute_history(TEST_TENANT, july_tenth())
        .await
        .expect("history should assemble");

    assert_eq!(months.len(), 12);
    assert_eq!(months[0].date, date(2016, 8, 31));
    assert_eq!(months[0].total_cost, dec!(689));
    assert_eq!(months[0].status, Some(InvoiceStatus::Paid));
    assert_eq!(months[1].total_cost, dec!(653));
    assert_eq!(months[7].total_cost, dec!(617));

    // No invoice for January 2017.
    assert_eq!(months[5].date, date(2017, 1, 1));
    assert_eq!(months[5].total_cost, Decimal::ZERO);
    assert_eq!(months[5].status, None);
    assert!(months[5].breakdown.is_empty());

    assert_eq!(months[11].date, date(2017, 7, 10));
    assert_eq!(backend.invoice_calls(), 1);
}

#[tokio::test]
async fn live_month_for_one_region() {
    let assembler = HistoryAssembler::new(single_region_backend(), regions(&["RegionOne"]));

    let months = assembler.compute_history(TEST_TENANT, july_tenth()).await.unwrap();
    let live = &months[11];

    assert_eq!(live.total_cost, dec!(43.5));
    assert_eq!(live.status, Some(InvoiceStatus::Open));
    assert_eq!(live.breakdown.len(), 3);

    let compute = &live.breakdown[&Category::Compute];
    assert_eq!((compute.count, compute.cost), (2, dec!(30)));
    let storage = &live.breakdown[&Category::ObjectStorage];
    assert_eq!((storage.count, storage.cost), (1, dec!(13.5)));
    let network = &live.breakdown[&Category::Network];
    assert_eq!((network.count, network.cost), (1, dec!(0)));

    let vm_lines = &live.details[&Category::Compute];
    assert_eq!(vm_lines.len(), 2);
    assert_eq!(vm_lines[0].resource_name.as_deref(), Some("my_instance"));
    assert_eq!(vm_lines[0].region.as_deref(), Some("RegionOne"));
    assert_eq!(vm_lines[1].resource_id.as_deref(), Some("3"));

    let items_total: Decimal = live.breakdown.values().map(|item| item.cost).sum();
    assert_eq!(items_total, live.total_cost);

    let discounts: Vec<_> = live
        .details
        .values()
        .flatten()
        .filter(|line| line.is_synthetic())
        .collect();
    assert_eq!(discounts.len(), 1);
    assert_eq!(discounts[0].resource_name.as_deref(), Some("Free Network Discount"));
    assert_eq!(discounts[0].region.as_deref(), Some(ALL_REGIONS));
    assert_eq!(discounts[0].cost, dec!(-2));
}

#[tokio::test]
async fn object_storage_is_counted_once_across_regions() {
    let backend = Arc::new(
        FakeRatingBackend::new()
            .with_invoices(invoices())
            .with_quotation("RegionOne", region_one_quotation())
            .with_quotation("RegionTwo", region_two_quotation()),
    );
    let assembler = HistoryAssembler::new(backend.clone(), regions(&["RegionOne", "RegionTwo"]));

    let months = assembler.compute_history(TEST_TENANT, july_tenth()).await.unwrap();
    let live = &months[11];

    assert_eq!(live.total_cost, dec!(58.5));
    assert_eq!(live.details[&Category::ObjectStorage].len(), 1);
    assert_eq!(live.breakdown[&Category::ObjectStorage].cost, dec!(13.5));
    assert_eq!(live.breakdown[&Category::Compute].count, 3);
    assert_eq!(live.breakdown[&Category::Compute].cost, dec!(45));
    assert_eq!(backend.quotation_calls(), 2);

    let items_total: Decimal = live.breakdown.values().map(|item| item.cost).sum();
    assert_eq!(items_total, live.total_cost);
}

#[tokio::test]
async fn region_without_a_quotation_does_not_change_the_divisor() {
    let backend = Arc::new(
        FakeRatingBackend::new()
            .with_invoices(invoices())
            .with_quotation("RegionOne", region_one_quotation()),
    );
    let assembler = HistoryAssembler::new(backend, regions(&["RegionOne", "RegionTwo"]));

    let months = assembler.compute_history(TEST_TENANT, july_tenth()).await.unwrap();

    assert_eq!(months[11].total_cost, dec!(43.5));
    assert_eq!(months[11].breakdown[&Category::ObjectStorage].cost, dec!(13.5));
}

#[tokio::test]
async fn no_regions_leave_the_live_month_empty() {
    let assembler = HistoryAssembler::new(single_region_backend(), regions(&[]));

    let months = assembler.compute_history(TEST_TENANT, july_tenth()).await.unwrap();

    assert_eq!(months.len(), 12);
    assert_eq!(months[0].total_cost, dec!(689));
    assert_eq!(months[11].date, date(2017, 7, 10));
    assert_eq!(months[11].total_cost, Decimal::ZERO);
    assert_eq!(months[11].status, None);
    assert!(months[11].breakdown.is_empty());
}

#[tokio::test]
async fn backend_failure_fails_the_whole_history() {
    let backend = single_region_backend();
    backend.set_failing(true);
    let assembler = HistoryAssembler::new(backend, regions(&["RegionOne"]));

    let result = assembler.compute_history(TEST_TENANT, july_tenth()).await;

    assert!(matches!(result, Err(UsageError::BackendUnavailable(_))));
}

#[tokio::test]
async fn region_directory_failure_fails_the_whole_history() {
    let assembler = HistoryAssembler::new(single_region_backend(), Arc::new(UnreachableRegions));

    let result = assembler.compute_history(TEST_TENANT, july_tenth()).await;

    assert!(matches!(result, Err(UsageError::BackendUnavailable(_))));
}

#[tokio::test]
async fn fully_cached_history_skips_the_invoice_call() {
    let mut all_months = serde_json::Map::new();
    for (year, month, day) in [
        (2016, 8, 31),
        (2016, 9, 30),
        (2016, 10, 31),
        (2016, 11, 30),
        (2016, 12, 31),
        (2017, 1, 31),
        (2017, 2, 28),
        (2017, 3, 31),
        (2017, 4, 30),
        (2017, 5, 31),
        (2017, 6, 30),
    ] {
        all_months.insert(
            format!("{year}-{month:02}-{day}"),
            serde_json::json!({"total_cost": 100.0 + f64::from(month), "status": "paid"}),
        );
    }
    let backend = Arc::new(
        FakeRatingBackend::new()
            .with_invoices(serde_json::Value::Object(all_months))
            .with_quotation("RegionOne", region_one_quotation()),
    );
    let cache = Arc::new(InMemoryMonthCache::new());
    let assembler = HistoryAssembler::new(backend.clone(), regions(&["RegionOne"]))
        .with_cache(cache.clone());

    let first = assembler.compute_history(TEST_TENANT, july_tenth()).await.unwrap();
    let second = assembler.compute_history(TEST_TENANT, july_tenth()).await.unwrap();

    assert_eq!(backend.invoice_calls(), 1);
    assert_eq!(backend.quotation_calls(), 2);
    assert_eq!(cache.len(), 11);
    assert_eq!(first, second);
    assert_eq!(second[10].total_cost, dec!(106));
}

#[tokio::test]
async fn months_without_invoices_are_not_cached() {
    let backend = single_region_backend();
    let cache = Arc::new(InMemoryMonthCache::new());
    let assembler = HistoryAssembler::new(backend.clone(), regions(&["RegionOne"]))
        .with_cache(cache.clone());

    assembler.compute_history(TEST_TENANT, july_tenth()).await.unwrap();
    let again = assembler.compute_history(TEST_TENANT, july_tenth()).await.unwrap();

    assert_eq!(cache.len(), 3);
    assert_eq!(backend.invoice_calls(), 2);
    assert_eq!(again[0].total_cost, dec!(689));
}

#[tokio::test]
async fn credits_pass_through() {
    let backend = Arc::new(FakeRatingBackend::new().with_credits(serde_json::json!({
        "credits": [{
            "code": "abc-123", "type": "Cloud Trial Credit",
            "expiry_date": "2017-09-30", "balance": 300.0,
            "recurring": false, "start_date": "2017-06-01"
        }]
    })));
    let assembler = HistoryAssembler::new(backend, regions(&["RegionOne"]));

    let credits = assembler.get_credits(TEST_TENANT).await.unwrap();

    assert_eq!(credits.credits.len(), 1);
    assert_eq!(credits.credits[0].credit_type, "Cloud Trial Credit");
    assert_eq!(credits.credits[0].balance, dec!(300));
}

#[tokio::test]
async fn closed_month_discounts_stay_out_of_the_breakdown() {
    let backend = Arc::new(
        FakeRatingBackend::new()
            .with_invoices(serde_json::json!({
                "2017-06-30": {"total_cost": 8.0, "status": "paid", "details": {
                    "Compute": {"total_cost": 10.0, "breakdown": {"NZ-POR-1.c1.c1r1": [
                        {"cost": 10.0, "quantity": 250, "rate": 0.04,
                         "resource_id": "vm", "resource_name": "web", "unit": "hour"}
                    ]}},
                    "Discounts": {"total_cost": -2.0, "breakdown": {"NZ-POR-1.discount": [
                        {"cost": -2.0, "quantity": 1, "rate": -2.0,
                         "resource_name": "Trial credit", "unit": "credit"}
                    ]}}
                }}
            }))
            .with_quotation("RegionOne", region_one_quotation()),
    );
    let assembler = HistoryAssembler::new(backend, regions(&["RegionOne"]));

    let months = assembler.compute_history(TEST_TENANT, july_tenth()).await.unwrap();
    let june = &months[10];

    assert_eq!(june.total_cost, dec!(8));
    assert!(!june.breakdown.contains_key(&Category::Discounts));
    assert!(june.breakdown.values().all(|item| item.cost >= Decimal::ZERO));
    assert_eq!(june.breakdown[&Category::Compute].cost, dec!(10));
    assert_eq!(june.details[&Category::Discounts][0].cost, dec!(-2));
}
