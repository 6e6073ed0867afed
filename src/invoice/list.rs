use chrono::NaiveDate;
use std::collections::HashMap;

use super::totals::{TaxMode, Totals};
use crate::backend::{Backend, InvoiceQuery, Page};
use crate::error::Result;
use crate::model::{InvoiceAction, InvoiceRecord, InvoiceStatus};

/// One row of the invoice list, annotated for display.
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceListRow {
    pub record: InvoiceRecord,
    pub advertiser: Option<String>,
    /// Recomputed from the current line items.
    pub totals: Totals,
    pub actions: Vec<InvoiceAction>,
}

/// Query one page of invoices, resolving each row's advertiser name and
/// recomputing its totals from its line items.
pub fn list_invoices(
    backend: &dyn Backend,
    query: &InvoiceQuery,
    tax_mode: TaxMode,
) -> Result<Page<InvoiceListRow>> {
    let page = backend.list_invoices(query)?;

    let mut names: HashMap<i64, Option<String>> = HashMap::new();
    let mut rows = Vec::with_capacity(page.rows.len());
    for record in &page.rows {
        let advertiser = match record.advertiser_id {
            Some(id) => {
                if !names.contains_key(&id) {
                    names.insert(id, backend.advertiser(id)?.map(|a| a.name));
                }
                names.get(&id).cloned().flatten()
            }
            None => None,
        };
        let items = backend.line_items(record.invoice_id)?;
        rows.push(InvoiceListRow {
            record: record.clone(),
            advertiser,
            totals: Totals::compute(&items, record.tax, tax_mode),
            actions: record.invoice_status.actions(),
        });
    }

    Ok(Page {
        rows,
        total_count: page.total_count,
        page: page.page,
        page_size: page.page_size,
    })
}

/// Relative due-date label: "due today", "in 3 days", "5 days overdue".
pub fn due_label(due: Option<NaiveDate>, status: InvoiceStatus, today: NaiveDate) -> String {
    if matches!(status, InvoiceStatus::Paid | InvoiceStatus::Canceled) {
        return "-".to_string();
    }
    let Some(due) = due else {
        return "no due date".to_string();
    };
    match (due - today).num_days() {
        0 => "due today".to_string(),
        1 => "in 1 day".to_string(),
        -1 => "1 day overdue".to_string(),
        n if n > 0 => format!("in {n} days"),
        n => format!("{} days overdue", -n),
    }
}
