//! Table-level access to the hosted backend.
//!
//! Every method is one independent request: there is no transaction
//! spanning calls, and concurrent writers simply overwrite each other.
//! Multi-step writes go through [`crate::invoice::UnitOfWork`].

mod local;
mod rest;

pub use local::{LocalStore, StoreData};
pub use rest::RestBackend;

use chrono::NaiveDate;

use crate::error::Result;
use crate::model::{
    AdvertiserRecord, BillingParty, Company, ContractRecord, ContractSummary, InvoiceRecord,
    InvoiceStatus, Lead, LineItemRecord, NewAdvertiser, NewCompany, NewContract,
};

pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const SEARCH_LIMIT: usize = 20;

pub trait Backend {
    fn invoice(&self, invoice_id: i64) -> Result<Option<InvoiceRecord>>;
    fn list_invoices(&self, query: &InvoiceQuery) -> Result<Page<InvoiceRecord>>;
    fn update_invoice(&self, record: &InvoiceRecord) -> Result<()>;

    fn line_items(&self, invoice_id: i64) -> Result<Vec<LineItemRecord>>;
    fn update_line_item(&self, item: &LineItemRecord) -> Result<()>;

    fn advertiser(&self, advertiser_id: i64) -> Result<Option<BillingParty>>;
    fn partner(&self, partner_id: i64) -> Result<Option<BillingParty>>;
    fn contract(&self, contract_id: i64) -> Result<Option<ContractSummary>>;

    /// Case-insensitive name prefix match, like `ilike 'jo%'`.
    fn search_advertisers(&self, prefix: &str, limit: usize) -> Result<Vec<BillingParty>>;
    fn search_partners(&self, prefix: &str, limit: usize) -> Result<Vec<BillingParty>>;
    fn search_contracts(&self, prefix: &str, limit: usize) -> Result<Vec<ContractSummary>>;

    fn insert_company(&self, company: &NewCompany) -> Result<Company>;
    fn delete_company(&self, company_id: i64) -> Result<()>;
    fn insert_advertiser(&self, advertiser: &NewAdvertiser) -> Result<AdvertiserRecord>;
    fn delete_advertiser(&self, advertiser_id: i64) -> Result<()>;
    fn insert_contract(&self, contract: &NewContract) -> Result<ContractRecord>;
    fn delete_contract(&self, contract_id: i64) -> Result<()>;

    fn leads(&self) -> Result<Vec<Lead>>;
}

/// Filters and page selection for the invoice list.
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceQuery {
    pub status: Option<InvoiceStatus>,
    /// Exact invoice id.
    pub id_match: Option<i64>,
    /// Inclusive lower bound on `issued_date`.
    pub from: Option<NaiveDate>,
    /// Inclusive upper bound on `issued_date`.
    pub to: Option<NaiveDate>,
    /// Zero-based page index.
    pub page: usize,
    pub page_size: usize,
}

impl Default for InvoiceQuery {
    fn default() -> Self {
        Self {
            status: None,
            id_match: None,
            from: None,
            to: None,
            page: 0,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl InvoiceQuery {
    pub fn offset(&self) -> usize {
        self.page.saturating_mul(self.page_size.max(1))
    }

    pub fn matches(&self, record: &InvoiceRecord) -> bool {
        if let Some(status) = self.status {
            if record.invoice_status != status {
                return false;
            }
        }
        if let Some(id) = self.id_match {
            if record.invoice_id != id {
                return false;
            }
        }
        if self.from.is_some() || self.to.is_some() {
            let Some(issued) = record.issued_date else {
                return false;
            };
            if self.from.is_some_and(|from| issued < from) {
                return false;
            }
            if self.to.is_some_and(|to| issued > to) {
                return false;
            }
        }
        true
    }
}

/// One page of a larger result set.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub rows: Vec<T>,
    pub total_count: usize,
    pub page: usize,
    pub page_size: usize,
}

impl<T> Page<T> {
    pub fn page_count(&self) -> usize {
        self.total_count.div_ceil(self.page_size.max(1))
    }

    pub fn has_previous(&self) -> bool {
        self.page > 0
    }

    pub fn has_next(&self) -> bool {
        self.page
            .saturating_add(1)
            .saturating_mul(self.page_size.max(1))
            < self.total_count
    }

    /// 1-based index of the first row on this page, or 0 when empty.
    pub fn first_row(&self) -> usize {
        if self.rows.is_empty() {
            0
        } else {
            self.page.saturating_mul(self.page_size.max(1)) + 1
        }
    }

    /// 1-based index of the last row on this page, or 0 when empty.
    pub fn last_row(&self) -> usize {
        if self.rows.is_empty() {
            0
        } else {
            self.first_row() + self.rows.len() - 1
        }
    }
}

/// Slice an already filtered and ordered result set into the requested page.
pub fn paginate<T>(rows: Vec<T>, page: usize, page_size: usize) -> Page<T> {
    let total_count = rows.len();
    let size = page_size.max(1);
    let rows = rows
        .into_iter()
        .skip(page.saturating_mul(size))
        .take(size)
        .collect();
    Page {
        rows,
        total_count,
        page,
        page_size: size,
    }
}

/// Case-insensitive prefix test used for `ilike 'prefix%'` lookups.
pub fn ilike_prefix(value: &str, prefix: &str) -> bool {
    value.to_lowercase().starts_with(&prefix.trim().to_lowercase())
}
