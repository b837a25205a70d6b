//! Combines per-region live-month breakdowns.

use crate::client::InvoicePayload;
use crate::models::RegionBreakdown;
use crate::services::normalizer::normalize_region;

/// One region's view of the live month.
#[derive(Debug, Clone)]
pub struct RegionalUsage {
    pub region: String,
    pub payload: InvoicePayload,
}

/// Normalize each region independently, then fold in region order.
///
/// Totals are a naive sum across regions; shared resources are still
/// overcounted at this point.
pub fn merge_regions(regional: &[RegionalUsage]) -> RegionBreakdown {
    regional
        .iter()
        .map(|usage| normalize_region(&usage.payload, &usage.region))
        .fold(RegionBreakdown::new(), RegionBreakdown::combine)
}
