//! Raw billable line as it flows through the pipeline.

use crate::models::Category;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Region tag of synthetic lines that apply across every region.
pub const ALL_REGIONS: &str = "All Regions";

/// One billable record.
///
/// `region` is absent in backend payloads and set by the normalizer.
/// Synthetic discount lines have a negative cost and no `resource_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageLine {
    pub product: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_name: Option<String>,
    pub rate: Decimal,
    pub quantity: Decimal,
    pub cost: Decimal,
    pub unit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

impl UsageLine {
    /// Key identifying the same logical resource across region views.
    /// Without a resource id the key is the SKU and name, ignoring the
    /// region prefix each view puts on the product.
    pub fn resource_key(&self) -> String {
        match &self.resource_id {
            Some(id) if !id.is_empty() => id.clone(),
            _ => format!(
                "{}/{}",
                Category::sku_of(&self.product),
                self.resource_name.as_deref().unwrap_or_default()
            ),
        }
    }

    pub fn is_synthetic(&self) -> bool {
        self.resource_id.is_none() && self.cost.is_sign_negative()
    }
}
