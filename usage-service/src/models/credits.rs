//! Tenant credit balances.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A credit grant (trial, development or education grant).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credit {
    pub code: String,
    #[serde(rename = "type")]
    pub credit_type: String,
    #[serde(default)]
    pub expiry_date: Option<String>,
    pub balance: Decimal,
    #[serde(default)]
    pub recurring: bool,
    #[serde(default)]
    pub start_date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditsResponse {
    #[serde(default)]
    pub credits: Vec<Credit>,
}
