use rust_decimal::Decimal;

use super::totals::{subtotal, TaxMode, Totals};
use crate::backend::Backend;
use crate::error::{AdminError, Result};
use crate::model::{BillingParty, ContractSummary, InvoiceRecord, LineItemRecord};

/// A line item with its contract join resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLine {
    pub item: LineItemRecord,
    pub contract: Option<ContractSummary>,
}

/// An invoice header, its billing parties and its line items.
///
/// Joins that cannot be resolved stay `None`; they never fail a load.
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceAggregate {
    pub header: InvoiceRecord,
    pub advertiser: Option<BillingParty>,
    pub partner: Option<BillingParty>,
    pub lines: Vec<ResolvedLine>,
}

impl InvoiceAggregate {
    pub fn id(&self) -> i64 {
        self.header.invoice_id
    }

    pub fn items(&self) -> Vec<LineItemRecord> {
        self.lines.iter().map(|l| l.item.clone()).collect()
    }

    pub fn subtotal(&self) -> Decimal {
        subtotal(&self.items())
    }

    /// Totals recomputed from the line items; the stored `total_amount` is ignored.
    pub fn totals(&self, mode: TaxMode) -> Totals {
        Totals::compute(&self.items(), self.header.tax, mode)
    }
}

/// Load an invoice and resolve every join it references.
pub fn load_aggregate(backend: &dyn Backend, invoice_id: i64) -> Result<InvoiceAggregate> {
    let header = backend
        .invoice(invoice_id)?
        .ok_or(AdminError::InvoiceNotFound(invoice_id))?;

    let advertiser = match header.advertiser_id {
        Some(id) => backend.advertiser(id)?,
        None => None,
    };
    let partner = match header.partner_id {
        Some(id) => backend.partner(id)?,
        None => None,
    };

    let mut lines = Vec::new();
    for item in backend.line_items(invoice_id)? {
        let contract = match item.contract_id {
            Some(id) => backend.contract(id)?,
            None => None,
        };
        lines.push(ResolvedLine { item, contract });
    }

    tracing::debug!(
        invoice_id,
        lines = lines.len(),
        advertiser = advertiser.is_some(),
        partner = partner.is_some(),
        "loaded invoice"
    );

    Ok(InvoiceAggregate {
        header,
        advertiser,
        partner,
        lines,
    })
}
