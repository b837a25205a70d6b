//! Response shapes. Costs are rounded to two decimals here and nowhere else.

use crate::models::{BillItem, Credit, CreditsResponse, MonthSummary, UsageLine};
use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

fn money(value: Decimal) -> f64 {
    value.round_dp(2).to_f64().unwrap_or_default()
}

fn plain(value: Decimal) -> f64 {
    value.to_f64().unwrap_or_default()
}

#[derive(Debug, Serialize)]
pub struct MonthSummaryView {
    pub date: NaiveDate,
    pub total_cost: f64,
    pub status: Option<String>,
    pub breakdown: Vec<BillItemView>,
    pub details: BTreeMap<String, Vec<UsageLineView>>,
}

#[derive(Debug, Serialize)]
pub struct BillItemView {
    pub id: u32,
    pub resource: String,
    pub count: u32,
    pub cost: f64,
}

#[derive(Debug, Serialize)]
pub struct UsageLineView {
    pub product: String,
    pub resource_id: Option<String>,
    pub resource_name: Option<String>,
    pub rate: f64,
    pub quantity: f64,
    pub cost: f64,
    pub unit: String,
    pub region: Option<String>,
}

impl From<&BillItem> for BillItemView {
    fn from(item: &BillItem) -> Self {
        Self {
            id: item.id,
            resource: item.category.as_str().to_string(),
            count: item.count,
            cost: money(item.cost),
        }
    }
}

impl From<&UsageLine> for UsageLineView {
    fn from(line: &UsageLine) -> Self {
        Self {
            product: line.product.clone(),
            resource_id: line.resource_id.clone(),
            resource_name: line.resource_name.clone(),
            rate: plain(line.rate),
            quantity: plain(line.quantity),
            cost: money(line.cost),
            unit: line.unit.clone(),
            region: line.region.clone(),
        }
    }
}

impl From<&MonthSummary> for MonthSummaryView {
    fn from(month: &MonthSummary) -> Self {
        Self {
            date: month.date,
            total_cost: money(month.total_cost),
            status: month.status.as_ref().map(|s| s.as_str().to_string()),
            breakdown: month.bill_items().into_iter().map(BillItemView::from).collect(),
            details: month
                .details
                .iter()
                .map(|(category, lines)| {
                    (
                        category.as_str().to_string(),
                        lines.iter().map(UsageLineView::from).collect(),
                    )
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreditView {
    pub code: String,
    #[serde(rename = "type")]
    pub credit_type: String,
    pub expiry_date: Option<String>,
    pub balance: f64,
    pub recurring: bool,
    pub start_date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreditsView {
    pub credits: Vec<CreditView>,
}

impl From<&Credit> for CreditView {
    fn from(credit: &Credit) -> Self {
        Self {
            code: credit.code.clone(),
            credit_type: credit.credit_type.clone(),
            expiry_date: credit.expiry_date.clone(),
            balance: money(credit.balance),
            recurring: credit.recurring,
            start_date: credit.start_date.clone(),
        }
    }
}

impl From<CreditsResponse> for CreditsView {
    fn from(response: CreditsResponse) -> Self {
        Self {
            credits: response.credits.iter().map(CreditView::from).collect(),
        }
    }
}
