//! Per-category accumulator for the live month.

use super::{BillItem, Category, UsageLine};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Running totals for one or more regions' usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegionBreakdown {
    pub total_cost: Decimal,
    pub items: BTreeMap<Category, BillItem>,
    pub details: BTreeMap<Category, Vec<UsageLine>>,
}

impl RegionBreakdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Accumulate one billable line into its category.
    pub fn record(&mut self, category: Category, line: UsageLine) {
        let next_id = self.items.len() as u32 + 1;
        let item = self
            .items
            .entry(category)
            .or_insert_with(|| BillItem::new(next_id, category));
        *item = item.adjusted(1, line.cost);
        self.total_cost += line.cost;
        self.details.entry(category).or_default().push(line);
    }

    /// Merge two accumulators: counts and costs add, detail lists concatenate
    /// (`self` first). Categories new to `self` get ids after its own, in
    /// `other`'s id order.
    pub fn combine(mut self, other: RegionBreakdown) -> RegionBreakdown {
        let mut incoming: Vec<BillItem> = other.items.into_values().collect();
        incoming.sort_by_key(|item| item.id);

        for item in incoming {
            let next_id = self.items.len() as u32 + 1;
            self.items
                .entry(item.category)
                .and_modify(|existing| {
                    *existing = existing.adjusted(i64::from(item.count), item.cost)
                })
                .or_insert_with(|| BillItem {
                    id: next_id,
                    ..item.clone()
                });
        }

        for (category, lines) in other.details {
            self.details.entry(category).or_default().extend(lines);
        }

        self.total_cost += other.total_cost;
        self
    }

    /// Sum of the category costs, which must equal `total_cost`.
    pub fn items_cost(&self) -> Decimal {
        self.items.values().map(|item| item.cost).sum()
    }

    /// Sum of the detail line costs for one category.
    pub fn lines_cost(&self, category: Category) -> Decimal {
        self.details
            .get(&category)
            .map(|lines| lines.iter().map(|l| l.cost).sum())
            .unwrap_or_default()
    }
}
