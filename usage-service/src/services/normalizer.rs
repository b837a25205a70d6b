//! Converts one region's quotation into a per-category breakdown.

use crate::client::{InvoicePayload, LinePayload};
use crate::error::UsageError;
use crate::models::{Category, RegionBreakdown, UsageLine};
use crate::services::metrics::record_integrity_skip;
use rust_decimal::Decimal;
use tracing::{debug, warn};

/// Canonical category for a reported category name, falling back to the
/// product SKU when the name is not recognised.
pub fn resolve_category(reported: &str, product: &str) -> Result<Category, UsageError> {
    Category::from_reported(reported)
        .or_else(|| Category::from_product(product))
        .ok_or_else(|| {
            UsageError::DataIntegrity(format!(
                "unknown category '{reported}' for product '{product}'"
            ))
        })
}

/// Build a pipeline line from a backend line. A missing rate becomes zero.
pub fn usage_line(product: &str, line: &LinePayload, region: Option<&str>) -> UsageLine {
    UsageLine {
        product: product.to_string(),
        resource_id: line.resource_id.clone(),
        resource_name: line.resource_name.clone(),
        rate: line.rate.unwrap_or(Decimal::ZERO),
        quantity: line.quantity,
        cost: line.cost,
        unit: line.unit.clone(),
        region: region.map(str::to_string),
    }
}

/// Normalize a single region's payload into a fresh breakdown.
///
/// Totals are summed from the lines, not taken from the payload's reported
/// totals. Products whose category cannot be resolved are logged and skipped.
pub fn normalize_region(payload: &InvoicePayload, region: &str) -> RegionBreakdown {
    let mut breakdown = RegionBreakdown::new();

    for (reported, category_payload) in &payload.details {
        for (product, lines) in &category_payload.breakdown {
            let category = match resolve_category(reported, product) {
                Ok(category) => category,
                Err(err) => {
                    warn!(
                        region,
                        category = %reported,
                        product = %product,
                        lines = lines.len(),
                        error = %err,
                        "Skipping usage with unrecognised category"
                    );
                    record_integrity_skip("unknown_category");
                    continue;
                }
            };

            for line in lines {
                breakdown.record(category, usage_line(product, line, Some(region)));
            }
        }
    }

    if breakdown.total_cost != payload.total_cost {
        debug!(
            region,
            reported = %payload.total_cost,
            computed = %breakdown.total_cost,
            "Region total differs from the sum of its lines"
        );
    }

    breakdown
}

/// Normalize `payload` into an accumulator that may already hold other
/// regions: counts and costs add, detail lists concatenate.
pub fn normalize(payload: &InvoicePayload, region: &str, acc: RegionBreakdown) -> RegionBreakdown {
    acc.combine(normalize_region(payload, region))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::RatedUsageResponse;
    use rust_decimal_macros::dec;

    fn rated_payload() -> InvoicePayload {
        let body = serde_json::json!({"usage": {
            "total_cost": 7.23,
            "resources": {
                "fake_uuid_1": {"type": "Image", "name": "cirros", "total_cost": 1.05,
                    "services": [{"volume": 2100, "rate": 0.0005, "cost": 1.05,
                                  "name": "b1.standard", "unit": "gigabyte"}]},
                "fake_uuid_2": {"type": "Virtual Machine", "name": "dfgh", "total_cost": 5.86,
                    "services": [{"volume": 122, "rate": 0.048, "cost": 5.86,
                                  "name": "m1.tiny", "unit": "hour"}]},
                "fake_uuid_3": {"type": "Virtual Machine", "name": "abcd", "total_cost": 9.60,
                    "services": [{"volume": 200, "rate": 0.048, "cost": 9.60,
                                  "name": "m1.tiny", "unit": "hour"}]},
                "fake_uuid_4": {"type": "Network", "name": "public", "total_cost": 0.48,
                    "services": [
                        {"volume": 20.00, "rate": 0.016, "cost": 0.32, "name": "n1.network", "unit": "hour"},
                        {"volume": 10.00, "rate": 0.016, "cost": 0.16, "name": "n1.network", "unit": "hour"}
                    ]}
            }
        }});
        serde_json::from_value::<RatedUsageResponse>(body)
            .unwrap()
            .usage
            .into_invoice()
    }

    #[test]
    fn normalizes_month_usage_into_bill_items() {
        let breakdown = normalize_region(&rated_payload(), "RegionOne");

        assert_eq!(breakdown.total_cost, dec!(16.99));
        assert_eq!(breakdown.items.len(), 3);

        let compute = &breakdown.items[&Category::Compute];
        assert_eq!((compute.count, compute.cost), (2, dec!(15.46)));
        let image = &breakdown.items[&Category::Image];
        assert_eq!((image.count, image.cost), (1, dec!(1.05)));
        let network = &breakdown.items[&Category::Network];
        assert_eq!((network.count, network.cost), (2, dec!(0.48)));

        assert_eq!(compute.cost.round_dp(2).to_string(), "15.46");
        for category in [Category::Compute, Category::Image, Category::Network] {
            assert_eq!(breakdown.items[&category].cost, breakdown.lines_cost(category));
        }
        assert!(breakdown.details[&Category::Network]
            .iter()
            .all(|l| l.region.as_deref() == Some("RegionOne")));
    }

    #[test]
    fn unknown_category_is_skipped_and_the_rest_proceeds() {
        let mut payload = rated_payload();
        payload.details.insert(
            "Quantum Flux".to_string(),
            crate::client::CategoryPayload {
                total_cost: dec!(100),
                breakdown: [(
                    "q1.flux".to_string(),
                    vec![LinePayload {
                        cost: dec!(100),
                        ..Default::default()
                    }],
                )]
                .into_iter()
                .collect(),
            },
        );

        let breakdown = normalize_region(&payload, "RegionOne");

        assert_eq!(breakdown.total_cost, dec!(16.99));
        assert_eq!(breakdown.items.len(), 3);
    }

    #[test]
    fn unknown_category_name_falls_back_to_product_sku() {
        assert_eq!(
            resolve_category("Misc", "NZ.n1.router").unwrap(),
            Category::Router
        );
        assert!(matches!(
            resolve_category("Misc", "z9.nothing"),
            Err(UsageError::DataIntegrity(_))
        ));
    }

    #[test]
    fn repeated_normalization_accumulates() {
        let payload = rated_payload();
        let once = normalize_region(&payload, "RegionOne");
        let twice = normalize(&payload, "RegionTwo", once);

        assert_eq!(twice.total_cost, dec!(33.98));
        assert_eq!(twice.items[&Category::Network].count, 4);
        assert_eq!(twice.details[&Category::Compute].len(), 4);
        assert_eq!(
            twice.details[&Category::Compute][2].region.as_deref(),
            Some("RegionTwo")
        );
    }
}
