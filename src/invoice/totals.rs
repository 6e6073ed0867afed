use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::model::LineItemRecord;

/// How the tax percentage is applied to the subtotal.
///
/// `Deduct`: `subtotal * (1 - tax/100)`. `Add`: `subtotal * (1 + tax/100)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaxMode {
    #[default]
    Deduct,
    Add,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub subtotal: Decimal,
    pub tax_percent: Decimal,
    pub tax_amount: Decimal,
    pub total: Decimal,
}

pub fn subtotal(lines: &[LineItemRecord]) -> Decimal {
    lines
        .iter()
        .map(LineItemRecord::line_total)
        .fold(Decimal::ZERO, Decimal::saturating_add)
}

impl Totals {
    pub fn compute(lines: &[LineItemRecord], tax_percent: Decimal, mode: TaxMode) -> Self {
        let subtotal = subtotal(lines);
        let tax_amount = subtotal.saturating_mul(tax_percent) / Decimal::ONE_HUNDRED;
        let total = match mode {
            TaxMode::Deduct => subtotal.saturating_sub(tax_amount),
            TaxMode::Add => subtotal.saturating_add(tax_amount),
        };
        Self {
            subtotal,
            tax_percent,
            tax_amount,
            total,
        }
    }
}
