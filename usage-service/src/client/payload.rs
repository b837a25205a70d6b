//! Wire shapes returned by the rating backend.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Invoice (closed month) or quotation (live month) for one tenant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoicePayload {
    #[serde(default)]
    pub total_cost: Decimal,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub details: BTreeMap<String, CategoryPayload>,
}

/// One reported category: its total and the lines grouped by product id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryPayload {
    #[serde(default)]
    pub total_cost: Decimal,
    #[serde(default)]
    pub breakdown: BTreeMap<String, Vec<LinePayload>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinePayload {
    #[serde(default)]
    pub cost: Decimal,
    #[serde(default)]
    pub quantity: Decimal,
    #[serde(default)]
    pub rate: Option<Decimal>,
    #[serde(default)]
    pub resource_id: Option<String>,
    #[serde(default)]
    pub resource_name: Option<String>,
    #[serde(default)]
    pub unit: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvoiceListing {
    #[serde(default)]
    pub invoices: BTreeMap<String, InvoicePayload>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuotationListing {
    #[serde(default)]
    pub quotations: BTreeMap<String, InvoicePayload>,
}

/// Legacy (v1) rated-usage response: usage keyed by resource id.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RatedUsageResponse {
    #[serde(default)]
    pub usage: RatedUsage,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RatedUsage {
    #[serde(default)]
    pub total_cost: Decimal,
    #[serde(default)]
    pub resources: BTreeMap<String, RatedResource>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RatedResource {
    #[serde(rename = "type")]
    pub resource_type: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub total_cost: Decimal,
    #[serde(default)]
    pub services: Vec<RatedService>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RatedService {
    pub name: String,
    #[serde(default)]
    pub volume: Decimal,
    #[serde(default)]
    pub rate: Option<Decimal>,
    #[serde(default)]
    pub cost: Decimal,
    #[serde(default)]
    pub unit: String,
}

impl RatedUsage {
    /// Regroup resource-keyed usage into the category/product shape.
    ///
    /// Rated usage is not pre-billed, so the total is the sum of the
    /// service costs rather than the reported figure.
    pub fn into_invoice(self) -> InvoicePayload {
        let mut invoice = InvoicePayload::default();

        for (resource_id, resource) in self.resources {
            let category = invoice.details.entry(resource.resource_type).or_default();
            for service in resource.services {
                category.total_cost += service.cost;
                invoice.total_cost += service.cost;
                category
                    .breakdown
                    .entry(service.name)
                    .or_default()
                    .push(LinePayload {
                        cost: service.cost,
                        quantity: service.volume,
                        rate: service.rate,
                        resource_id: Some(resource_id.clone()),
                        resource_name: resource.name.clone(),
                        unit: service.unit,
                    });
            }
        }

        if invoice.total_cost != self.total_cost {
            tracing::debug!(
                reported = %self.total_cost,
                computed = %invoice.total_cost,
                "Rated usage total differs from the sum of its services"
            );
        }

        invoice
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn quotation_listing_decodes_numeric_costs() {
        let body = serde_json::json!({
            "quotations": {"2017-07-10": {
                "total_cost": 2,
                "details": {"Network": {
                    "total_cost": 2,
                    "breakdown": {"NZ.n1.network": [{
                        "cost": 2, "quantity": 200, "rate": 0.01,
                        "resource_id": "8", "resource_name": "my_network", "unit": "hour"
                    }]}
                }}
            }}
        });

        let listing: QuotationListing = serde_json::from_value(body).unwrap();
        let quotation = &listing.quotations["2017-07-10"];
        let line = &quotation.details["Network"].breakdown["NZ.n1.network"][0];

        assert_eq!(quotation.status, None);
        assert_eq!(line.rate, Some(dec!(0.01)));
        assert_eq!(line.cost, dec!(2));
        assert_eq!(line.resource_id.as_deref(), Some("8"));
    }

    #[test]
    fn rated_usage_regroups_by_reported_type() {
        let body = serde_json::json!({"usage": {
            "total_cost": 7.23,
            "resources": {
                "fake_uuid_4": {"type": "Network", "name": "public", "total_cost": 0.48,
                    "services": [
                        {"volume": 20.0, "rate": 0.016, "cost": 0.32, "name": "n1.network", "unit": "hour"},
                        {"volume": 10.0, "rate": 0.016, "cost": 0.16, "name": "n1.network", "unit": "hour"}
                    ]},
                "fake_uuid_1": {"type": "Image", "name": "cirros", "total_cost": 1.05,
                    "services": [
                        {"volume": 2100, "rate": 0.0005, "cost": 1.05, "name": "b1.standard", "unit": "gigabyte"}
                    ]}
            }
        }});

        let rated: RatedUsageResponse = serde_json::from_value(body).unwrap();
        let invoice = rated.usage.into_invoice();

        assert_eq!(invoice.total_cost, dec!(1.53));
        assert_eq!(invoice.details["Network"].total_cost, dec!(0.48));
        assert_eq!(invoice.details["Network"].breakdown["n1.network"].len(), 2);
        assert_eq!(
            invoice.details["Image"].breakdown["b1.standard"][0]
                .resource_id
                .as_deref(),
            Some("fake_uuid_1")
        );
    }
}
