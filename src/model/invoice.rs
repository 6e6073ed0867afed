use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Invoice lifecycle status as stored in `invoice_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum InvoiceStatus {
    #[default]
    Draft,
    Sent,
    Received,
    Paid,
    Canceled,
}

/// What an operator may do with an invoice from the list view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvoiceAction {
    Download,
    Edit,
    Send,
}

impl InvoiceStatus {
    pub const ALL: [InvoiceStatus; 5] = [
        InvoiceStatus::Draft,
        InvoiceStatus::Sent,
        InvoiceStatus::Received,
        InvoiceStatus::Paid,
        InvoiceStatus::Canceled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "Draft",
            InvoiceStatus::Sent => "Sent",
            InvoiceStatus::Received => "Received",
            InvoiceStatus::Paid => "Paid",
            InvoiceStatus::Canceled => "Canceled",
        }
    }

    /// Case-insensitive parse of a status name.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
    }

    pub fn is_editable(&self) -> bool {
        matches!(
            self,
            InvoiceStatus::Draft | InvoiceStatus::Sent | InvoiceStatus::Received
        )
    }

    pub fn can_send(&self) -> bool {
        *self == InvoiceStatus::Draft
    }

    /// Actions offered for an invoice in this status. Download is always available.
    pub fn actions(&self) -> Vec<InvoiceAction> {
        let mut actions = vec![InvoiceAction::Download];
        if self.is_editable() {
            actions.push(InvoiceAction::Edit);
        }
        if self.can_send() {
            actions.push(InvoiceAction::Send);
        }
        actions
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for InvoiceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            InvoiceAction::Download => "download",
            InvoiceAction::Edit => "edit",
            InvoiceAction::Send => "send",
        };
        f.write_str(label)
    }
}

/// Payment term stored in `payment_term`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentTerm {
    #[serde(rename = "prepay")]
    Prepay,
    #[serde(rename = "30")]
    Net30,
    #[serde(rename = "60")]
    Net60,
    #[serde(rename = "90")]
    Net90,
}

impl PaymentTerm {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "prepay" => Some(PaymentTerm::Prepay),
            "30" | "net30" => Some(PaymentTerm::Net30),
            "60" | "net60" => Some(PaymentTerm::Net60),
            "90" | "net90" => Some(PaymentTerm::Net90),
            _ => None,
        }
    }

    pub fn days(&self) -> i64 {
        match self {
            PaymentTerm::Prepay => 0,
            PaymentTerm::Net30 => 30,
            PaymentTerm::Net60 => 60,
            PaymentTerm::Net90 => 90,
        }
    }

    pub fn due_date_from(&self, issued: NaiveDate) -> NaiveDate {
        issued
            .checked_add_signed(Duration::days(self.days()))
            .unwrap_or(issued)
    }
}

impl fmt::Display for PaymentTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentTerm::Prepay => f.write_str("Prepay"),
            other => write!(f, "Net {} days", other.days()),
        }
    }
}

/// A row of the `invoices` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceRecord {
    pub invoice_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advertiser_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partner_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issued_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_term: Option<PaymentTerm>,
    /// Written at save time only; never read back as the displayed total.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<Decimal>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub invoice_status: InvoiceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Tax rate in percent.
    #[serde(default, deserialize_with = "null_as_default")]
    pub tax: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_date: Option<DateTime<Utc>>,
}

/// A row of the `invoice_items` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItemRecord {
    pub id: i64,
    pub invoice_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_id: Option<i64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub retainer: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub unit_price: Decimal,
}

impl LineItemRecord {
    /// `retainer * unit_price`, saturating at the largest representable amount.
    pub fn line_total(&self) -> Decimal {
        Decimal::from(self.retainer).saturating_mul(self.unit_price)
    }

    /// `retainer * unit_price`, or `None` when the product does not fit.
    pub fn checked_line_total(&self) -> Option<Decimal> {
        Decimal::from(self.retainer).checked_mul(self.unit_price)
    }
}

/// Columns that are unset on the backend arrive as `null`; read them as the default.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}
