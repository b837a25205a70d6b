//! One slot of the twelve-month cost history.

use super::{BillItem, Category, RegionBreakdown, UsageLine};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Payment/lifecycle status reported for a month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum InvoiceStatus {
    Open,
    Paid,
    Other(String),
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &str {
        match self {
            InvoiceStatus::Open => "open",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Other(s) => s.as_str(),
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "open" => InvoiceStatus::Open,
            "paid" => InvoiceStatus::Paid,
            _ => InvoiceStatus::Other(s.to_string()),
        }
    }
}

impl From<String> for InvoiceStatus {
    fn from(s: String) -> Self {
        InvoiceStatus::from_string(&s)
    }
}

impl From<InvoiceStatus> for String {
    fn from(status: InvoiceStatus) -> Self {
        status.as_str().to_string()
    }
}

/// Cost summary for one calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthSummary {
    pub date: NaiveDate,
    pub total_cost: Decimal,
    pub status: Option<InvoiceStatus>,
    pub breakdown: BTreeMap<Category, BillItem>,
    pub details: BTreeMap<Category, Vec<UsageLine>>,
}

impl MonthSummary {
    /// Neutral default for a month the backend has no record of.
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            total_cost: Decimal::ZERO,
            status: None,
            breakdown: BTreeMap::new(),
            details: BTreeMap::new(),
        }
    }

    /// Install a live-month breakdown.
    pub fn from_breakdown(
        date: NaiveDate,
        status: Option<InvoiceStatus>,
        breakdown: RegionBreakdown,
    ) -> Self {
        Self {
            date,
            total_cost: breakdown.total_cost,
            status,
            breakdown: breakdown.items,
            details: breakdown.details,
        }
    }

    /// Breakdown rows ordered by assignment id.
    pub fn bill_items(&self) -> Vec<&BillItem> {
        let mut items: Vec<&BillItem> = self.breakdown.values().collect();
        items.sort_by_key(|item| item.id);
        items
    }
}
