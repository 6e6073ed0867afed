use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A row of the `leads` table, in the shape the CSV export projects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub lead_id: String,
    #[serde(default)]
    pub created_date: Option<NaiveDate>,
    #[serde(default)]
    pub campaign: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub retained: Option<bool>,
    #[serde(default)]
    pub retained_date: Option<NaiveDate>,
    #[serde(default)]
    pub revenue: Option<Decimal>,
    #[serde(default)]
    pub returned: Option<bool>,
    #[serde(default)]
    pub return_date: Option<NaiveDate>,
}
