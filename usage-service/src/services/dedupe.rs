//! Removes the overcount of globally shared resources.
//!
//! Object Storage is one global service, but every region reports the full
//! usage. After a naive merge across `n` regions its cost is counted `n`
//! times; only one share is kept.

use crate::models::{Category, RegionBreakdown, UsageLine, ALL_REGIONS};
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::debug;

/// Subtract `(n - 1) * (cost / n)` from every globally shared category and
/// collapse its lines to one per logical resource.
///
/// A no-op when fewer than two regions contributed or the category is absent.
pub fn remove_excess_shared_cost(
    mut breakdown: RegionBreakdown,
    region_count: usize,
) -> RegionBreakdown {
    if region_count <= 1 {
        return breakdown;
    }
    let n = Decimal::from(region_count as u64);

    for category in Category::ALL.into_iter().filter(|c| c.is_globally_shared()) {
        let Some(item) = breakdown.items.get(&category) else {
            continue;
        };

        let excess = Decimal::from(region_count as u64 - 1) * (item.cost / n);
        let lines = breakdown.details.remove(&category).unwrap_or_default();
        let collapsed = collapse_shared_lines(lines, n);
        let updated = item.with_totals(collapsed.len() as u32, item.cost - excess);

        debug!(
            category = %category,
            regions = region_count,
            excess = %excess,
            "Removed duplicated shared cost"
        );

        breakdown.items.insert(category, updated);
        breakdown.details.insert(category, collapsed);
        breakdown.total_cost -= excess;
    }

    breakdown
}

/// Keep the first line per resource, carrying the group's mean cost and
/// peak quantity.
fn collapse_shared_lines(lines: Vec<UsageLine>, n: Decimal) -> Vec<UsageLine> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, UsageLine> = HashMap::new();

    for line in lines {
        let key = line.resource_key();
        match groups.get_mut(&key) {
            Some(kept) => {
                kept.cost += line.cost;
                kept.quantity = kept.quantity.max(line.quantity);
            }
            None => {
                order.push(key.clone());
                groups.insert(key, line);
            }
        }
    }

    order
        .into_iter()
        .filter_map(|key| groups.remove(&key))
        .map(|mut line| {
            line.cost /= n;
            line.region = Some(ALL_REGIONS.to_string());
            line
        })
        .collect()
}
