//! Free-tier discount on hourly-billed categories.

use crate::error::UsageError;
use crate::models::{Category, RegionBreakdown, UsageLine, ALL_REGIONS};
use crate::services::calendar::elapsed_hours_in_month;
use crate::services::metrics::record_integrity_skip;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{debug, warn};

/// Credit up to `rate * elapsed hours` against each free-tier category.
///
/// Appends one synthetic negative line per discounted category. Not
/// idempotent: apply once per computation.
pub fn apply_free_tier(mut breakdown: RegionBreakdown, now: DateTime<Utc>) -> RegionBreakdown {
    let free_hours = Decimal::from(elapsed_hours_in_month(now));

    for category in Category::FREE_TIER {
        if let Err(err) = discount_category(&mut breakdown, category, free_hours) {
            warn!(category = %category, error = %err, "Skipping free tier discount");
            record_integrity_skip("missing_rate");
        }
    }

    breakdown
}

fn discount_category(
    breakdown: &mut RegionBreakdown,
    category: Category,
    free_hours: Decimal,
) -> Result<(), UsageError> {
    let Some(item) = breakdown.items.get(&category).cloned() else {
        return Ok(());
    };
    if item.cost <= Decimal::ZERO {
        return Ok(());
    }

    let first = breakdown
        .details
        .get(&category)
        .and_then(|lines| lines.first())
        .ok_or_else(|| {
            UsageError::DataIntegrity(format!("{category} has cost but no usage lines"))
        })?;
    let rate = first.rate;
    if rate <= Decimal::ZERO {
        return Err(UsageError::DataIntegrity(format!(
            "{category} usage carries no rate"
        )));
    }

    let tentative = rate * free_hours;
    let (discount, hours) = if item.cost <= tentative {
        (item.cost, (item.cost / rate).normalize())
    } else {
        (tentative, free_hours)
    };

    let line = UsageLine {
        product: first.product.clone(),
        resource_id: None,
        resource_name: Some(category.free_tier_label()),
        rate: -rate,
        quantity: hours,
        cost: -discount,
        unit: first.unit.clone(),
        region: Some(ALL_REGIONS.to_string()),
    };

    debug!(category = %category, discount = %discount, hours = %hours, "Applied free tier discount");

    breakdown.items.insert(category, item.adjusted(0, -discount));
    breakdown.total_cost -= discount;
    breakdown.details.entry(category).or_default().push(line);
    Ok(())
}
