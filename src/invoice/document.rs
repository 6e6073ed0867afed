use serde::Serialize;
use std::path::{Path, PathBuf};

use super::aggregate::{load_aggregate, InvoiceAggregate, ResolvedLine};
use super::totals::TaxMode;
use crate::backend::Backend;
use crate::config::InvoiceSettings;
use crate::error::Result;
use crate::format::{format_date, format_money, format_percent, or_placeholder, PLACEHOLDER};
use crate::model::BillingParty;
use crate::pdf::generate_pdf;

#[derive(Debug, Clone, PartialEq)]
pub struct RenderSettings {
    pub currency_symbol: String,
    pub tax_mode: TaxMode,
}

impl RenderSettings {
    pub fn from_config(settings: &InvoiceSettings) -> Self {
        Self {
            currency_symbol: settings.currency_symbol.clone(),
            tax_mode: settings.tax_mode,
        }
    }
}

/// A bill-to or invoice-to block
#[derive(Debug, Serialize, PartialEq)]
pub struct PartyBlock {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub company: String,
    pub address: String,
    pub company_phone: String,
    pub url: String,
}

/// A row of the line-item table
#[derive(Debug, Serialize, PartialEq)]
pub struct DocumentLine {
    pub vertical: String,
    pub contract: String,
    pub retainer: u32,
    pub unit_price: String,
    pub total: String,
}

/// Complete, display-ready invoice data for PDF generation
#[derive(Debug, Serialize, PartialEq)]
pub struct InvoiceDocument {
    pub number: String,
    pub issued_date: String,
    pub due_date: String,
    pub payment_term: String,
    pub status: String,
    pub note: Option<String>,
    pub bill_to: PartyBlock,
    pub invoice_to: PartyBlock,
    pub lines: Vec<DocumentLine>,
    pub subtotal: String,
    pub tax_percent: String,
    pub tax_amount: String,
    pub total: String,
}

impl PartyBlock {
    fn from_party(party: Option<&BillingParty>) -> Self {
        let company = party.and_then(|p| p.company.as_ref());
        Self {
            name: or_placeholder(party.map(|p| p.name.as_str())),
            email: or_placeholder(party.and_then(|p| p.email.as_deref())),
            phone: or_placeholder(party.and_then(|p| p.phone.as_deref())),
            company: or_placeholder(company.map(|c| c.company_name.as_str())),
            address: or_placeholder(company.and_then(|c| c.address.as_deref())),
            company_phone: or_placeholder(company.and_then(|c| c.phone.as_deref())),
            url: or_placeholder(company.and_then(|c| c.url.as_deref())),
        }
    }
}

impl DocumentLine {
    fn from_line(line: &ResolvedLine, currency_symbol: &str) -> Self {
        let contract = line.contract.as_ref();
        Self {
            vertical: or_placeholder(
                contract
                    .and_then(|c| c.vertical.as_ref())
                    .map(|v| v.vertical_name.as_str()),
            ),
            contract: or_placeholder(contract.map(|c| c.contract_name.as_str())),
            retainer: line.item.retainer,
            unit_price: format_money(line.item.unit_price, currency_symbol),
            total: format_money(line.item.line_total(), currency_symbol),
        }
    }
}

impl InvoiceDocument {
    /// Pure projection of a loaded invoice. Totals are recomputed from the lines.
    pub fn from_aggregate(invoice: &InvoiceAggregate, settings: &RenderSettings) -> Self {
        let header = &invoice.header;
        let totals = invoice.totals(settings.tax_mode);
        let symbol = settings.currency_symbol.as_str();

        Self {
            number: header.invoice_id.to_string(),
            issued_date: format_date(header.issued_date),
            due_date: format_date(header.due_date),
            payment_term: header
                .payment_term
                .map(|t| t.to_string())
                .unwrap_or_else(|| PLACEHOLDER.to_string()),
            status: header.invoice_status.to_string(),
            note: header.note.clone(),
            bill_to: PartyBlock::from_party(invoice.advertiser.as_ref()),
            invoice_to: PartyBlock::from_party(invoice.partner.as_ref()),
            lines: invoice
                .lines
                .iter()
                .map(|l| DocumentLine::from_line(l, symbol))
                .collect(),
            subtotal: format_money(totals.subtotal, symbol),
            tax_percent: format_percent(totals.tax_percent),
            tax_amount: format_money(totals.tax_amount, symbol),
            total: format_money(totals.total, symbol),
        }
    }
}

pub fn pdf_file_name(invoice_id: i64) -> String {
    format!("invoice_{invoice_id}.pdf")
}

/// Render the persisted invoice to `<output_dir>/invoice_<id>.pdf`.
pub fn download_invoice(
    backend: &dyn Backend,
    invoice_id: i64,
    settings: &RenderSettings,
    output_dir: &Path,
) -> Result<PathBuf> {
    let invoice = load_aggregate(backend, invoice_id)?;
    let document = InvoiceDocument::from_aggregate(&invoice, settings);

    std::fs::create_dir_all(output_dir)?;
    let path = output_dir.join(pdf_file_name(invoice_id));
    generate_pdf(&document, &path)?;

    tracing::info!(invoice_id, path = %path.display(), "rendered invoice");
    Ok(path)
}
