//! Per-category aggregate cost.

use super::Category;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One category's aggregate cost for a month.
///
/// `id` is the assignment order within a single computation (1-based).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillItem {
    pub id: u32,
    pub category: Category,
    pub count: u32,
    pub cost: Decimal,
}

impl BillItem {
    pub fn new(id: u32, category: Category) -> Self {
        Self {
            id,
            category,
            count: 0,
            cost: Decimal::ZERO,
        }
    }

    /// Returns a copy with `count` and `cost` shifted by the given deltas.
    pub fn adjusted(&self, count_delta: i64, cost_delta: Decimal) -> Self {
        let count = (i64::from(self.count) + count_delta).clamp(0, i64::from(u32::MAX)) as u32;
        Self {
            count,
            cost: self.cost + cost_delta,
            ..self.clone()
        }
    }

    /// Returns a copy carrying a new count and cost.
    pub fn with_totals(&self, count: u32, cost: Decimal) -> Self {
        Self {
            count,
            cost,
            ..self.clone()
        }
    }
}
