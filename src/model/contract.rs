use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vertical {
    pub vertical_id: i64,
    pub vertical_name: String,
}

/// A row of the `contracts` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractRecord {
    pub contract_id: i64,
    pub contract_name: String,
    pub advertiser_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vertical_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget_limit: Option<Decimal>,
}

/// A contract with its vertical join resolved, as shown on invoice lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractSummary {
    pub contract_id: i64,
    pub contract_name: String,
    #[serde(default)]
    pub vertical: Option<Vertical>,
}

/// Insert payload for `contracts`.
#[derive(Debug, Clone, Serialize)]
pub struct NewContract {
    pub contract_name: String,
    pub advertiser_id: i64,
    pub vertical_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget_limit: Option<Decimal>,
}
