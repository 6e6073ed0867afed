use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use super::{ilike_prefix, paginate, Backend, InvoiceQuery, Page};
use crate::error::{AdminError, Result};
use crate::model::{
    AdvertiserRecord, BillingParty, Company, ContractRecord, ContractSummary, InvoiceRecord, Lead,
    LineItemRecord, NewAdvertiser, NewCompany, NewContract, PartnerRecord, Vertical,
};

/// Every table of the local store, as laid out in `store.toml`.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct StoreData {
    #[serde(default)]
    pub companies: Vec<Company>,
    #[serde(default)]
    pub advertisers: Vec<AdvertiserRecord>,
    #[serde(default)]
    pub partners: Vec<PartnerRecord>,
    #[serde(default)]
    pub verticals: Vec<Vertical>,
    #[serde(default)]
    pub contracts: Vec<ContractRecord>,
    #[serde(default)]
    pub invoices: Vec<InvoiceRecord>,
    #[serde(default)]
    pub invoice_items: Vec<LineItemRecord>,
    #[serde(default)]
    pub leads: Vec<Lead>,
}

impl StoreData {
    fn company(&self, company_id: Option<i64>) -> Option<Company> {
        let id = company_id?;
        self.companies.iter().find(|c| c.company_id == id).cloned()
    }

    fn advertiser_party(&self, record: &AdvertiserRecord) -> BillingParty {
        BillingParty {
            id: record.advertiser_id,
            name: record.name.clone(),
            email: record.email.clone(),
            phone: record.phone.clone(),
            company: self.company(record.company_id),
        }
    }

    fn partner_party(&self, record: &PartnerRecord) -> BillingParty {
        BillingParty {
            id: record.partner_id,
            name: record.name.clone(),
            email: record.email.clone(),
            phone: record.phone.clone(),
            company: self.company(record.company_id),
        }
    }

    fn contract_summary(&self, record: &ContractRecord) -> ContractSummary {
        let vertical = record
            .vertical_id
            .and_then(|id| self.verticals.iter().find(|v| v.vertical_id == id).cloned());
        ContractSummary {
            contract_id: record.contract_id,
            contract_name: record.contract_name.clone(),
            vertical,
        }
    }
}

/// Backend over a single TOML file. Every call re-reads the file and every
/// write rewrites it, so two processes editing the same store get
/// last-write-wins per call, like the hosted backend.
#[derive(Debug, Clone)]
pub struct LocalStore {
    path: PathBuf,
}

impl LocalStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<StoreData> {
        if !self.path.exists() {
            return Err(AdminError::ConfigFileNotFound(self.path.clone()));
        }
        let content = fs::read_to_string(&self.path)?;
        toml::from_str(&content).map_err(|e| AdminError::ConfigParse {
            path: self.path.clone(),
            source: e,
        })
    }

    pub fn save(&self, data: &StoreData) -> Result<()> {
        let content =
            toml::to_string_pretty(data).map_err(|e| AdminError::StoreWrite(e.to_string()))?;
        fs::write(&self.path, content)?;
        Ok(())
    }

    fn modify<T>(&self, f: impl FnOnce(&mut StoreData) -> Result<T>) -> Result<T> {
        let mut data = self.load()?;
        let out = f(&mut data)?;
        self.save(&data)?;
        Ok(out)
    }
}

fn missing_row(table: &str, id: i64) -> AdminError {
    AdminError::Backend {
        status: 404,
        message: format!("No row in '{table}' with id {id}"),
    }
}

fn next_id(ids: impl Iterator<Item = i64>) -> i64 {
    ids.max().unwrap_or(0) + 1
}

impl Backend for LocalStore {
    fn invoice(&self, invoice_id: i64) -> Result<Option<InvoiceRecord>> {
        let data = self.load()?;
        Ok(data
            .invoices
            .into_iter()
            .find(|i| i.invoice_id == invoice_id))
    }

    fn list_invoices(&self, query: &InvoiceQuery) -> Result<Page<InvoiceRecord>> {
        let data = self.load()?;
        let mut rows: Vec<InvoiceRecord> = data
            .invoices
            .into_iter()
            .filter(|i| query.matches(i))
            .collect();
        rows.sort_by(|a, b| b.invoice_id.cmp(&a.invoice_id));
        Ok(paginate(rows, query.page, query.page_size))
    }

    fn update_invoice(&self, record: &InvoiceRecord) -> Result<()> {
        tracing::debug!(invoice_id = record.invoice_id, "updating invoice header");
        self.modify(|data| {
            let row = data
                .invoices
                .iter_mut()
                .find(|i| i.invoice_id == record.invoice_id)
                .ok_or_else(|| missing_row("invoices", record.invoice_id))?;
            *row = record.clone();
            Ok(())
        })
    }

    fn line_items(&self, invoice_id: i64) -> Result<Vec<LineItemRecord>> {
        let data = self.load()?;
        let mut items: Vec<LineItemRecord> = data
            .invoice_items
            .into_iter()
            .filter(|item| item.invoice_id == invoice_id)
            .collect();
        items.sort_by_key(|item| item.id);
        Ok(items)
    }

    fn update_line_item(&self, item: &LineItemRecord) -> Result<()> {
        tracing::debug!(id = item.id, invoice_id = item.invoice_id, "updating line item");
        self.modify(|data| {
            let row = data
                .invoice_items
                .iter_mut()
                .find(|i| i.id == item.id)
                .ok_or_else(|| missing_row("invoice_items", item.id))?;
            *row = item.clone();
            Ok(())
        })
    }

    fn advertiser(&self, advertiser_id: i64) -> Result<Option<BillingParty>> {
        let data = self.load()?;
        Ok(data
            .advertisers
            .iter()
            .find(|a| a.advertiser_id == advertiser_id)
            .map(|a| data.advertiser_party(a)))
    }

    fn partner(&self, partner_id: i64) -> Result<Option<BillingParty>> {
        let data = self.load()?;
        Ok(data
            .partners
            .iter()
            .find(|p| p.partner_id == partner_id)
            .map(|p| data.partner_party(p)))
    }

    fn contract(&self, contract_id: i64) -> Result<Option<ContractSummary>> {
        let data = self.load()?;
        Ok(data
            .contracts
            .iter()
            .find(|c| c.contract_id == contract_id)
            .map(|c| data.contract_summary(c)))
    }

    fn search_advertisers(&self, prefix: &str, limit: usize) -> Result<Vec<BillingParty>> {
        let data = self.load()?;
        Ok(data
            .advertisers
            .iter()
            .filter(|a| ilike_prefix(&a.name, prefix))
            .take(limit)
            .map(|a| data.advertiser_party(a))
            .collect())
    }

    fn search_partners(&self, prefix: &str, limit: usize) -> Result<Vec<BillingParty>> {
        let data = self.load()?;
        Ok(data
            .partners
            .iter()
            .filter(|p| ilike_prefix(&p.name, prefix))
            .take(limit)
            .map(|p| data.partner_party(p))
            .collect())
    }

    fn search_contracts(&self, prefix: &str, limit: usize) -> Result<Vec<ContractSummary>> {
        let data = self.load()?;
        Ok(data
            .contracts
            .iter()
            .filter(|c| ilike_prefix(&c.contract_name, prefix))
            .take(limit)
            .map(|c| data.contract_summary(c))
            .collect())
    }

    fn insert_company(&self, company: &NewCompany) -> Result<Company> {
        self.modify(|data| {
            let row = Company {
                company_id: next_id(data.companies.iter().map(|c| c.company_id)),
                company_name: company.company_name.clone(),
                address: company.address.clone(),
                phone: company.phone.clone(),
                url: company.url.clone(),
            };
            data.companies.push(row.clone());
            Ok(row)
        })
    }

    fn delete_company(&self, company_id: i64) -> Result<()> {
        self.modify(|data| {
            data.companies.retain(|c| c.company_id != company_id);
            Ok(())
        })
    }

    fn insert_advertiser(&self, advertiser: &NewAdvertiser) -> Result<AdvertiserRecord> {
        self.modify(|data| {
            if !data
                .companies
                .iter()
                .any(|c| c.company_id == advertiser.company_id)
            {
                return Err(AdminError::Backend {
                    status: 409,
                    message: format!(
                        "advertisers.company_id references missing company {}",
                        advertiser.company_id
                    ),
                });
            }
            let row = AdvertiserRecord {
                advertiser_id: next_id(data.advertisers.iter().map(|a| a.advertiser_id)),
                name: advertiser.name.clone(),
                email: advertiser.email.clone(),
                phone: advertiser.phone.clone(),
                company_id: Some(advertiser.company_id),
            };
            data.advertisers.push(row.clone());
            Ok(row)
        })
    }

    fn delete_advertiser(&self, advertiser_id: i64) -> Result<()> {
        self.modify(|data| {
            data.advertisers.retain(|a| a.advertiser_id != advertiser_id);
            Ok(())
        })
    }

    fn insert_contract(&self, contract: &NewContract) -> Result<ContractRecord> {
        self.modify(|data| {
            if !data
                .verticals
                .iter()
                .any(|v| v.vertical_id == contract.vertical_id)
            {
                return Err(AdminError::Backend {
                    status: 409,
                    message: format!(
                        "contracts.vertical_id references missing vertical {}",
                        contract.vertical_id
                    ),
                });
            }
            let row = ContractRecord {
                contract_id: next_id(data.contracts.iter().map(|c| c.contract_id)),
                contract_name: contract.contract_name.clone(),
                advertiser_id: contract.advertiser_id,
                vertical_id: Some(contract.vertical_id),
                budget_limit: contract.budget_limit,
            };
            data.contracts.push(row.clone());
            Ok(row)
        })
    }

    fn delete_contract(&self, contract_id: i64) -> Result<()> {
        self.modify(|data| {
            data.contracts.retain(|c| c.contract_id != contract_id);
            Ok(())
        })
    }

    fn leads(&self) -> Result<Vec<Lead>> {
        Ok(self.load()?.leads)
    }
}
