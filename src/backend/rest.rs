use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use ureq::Agent;

use super::{Backend, InvoiceQuery, Page};
use crate::error::{AdminError, Result};
use crate::model::{
    AdvertiserRecord, BillingParty, Company, ContractRecord, ContractSummary, InvoiceRecord,
    InvoiceStatus, Lead, LineItemRecord, NewAdvertiser, NewCompany, NewContract, PaymentTerm,
};

const ADVERTISER_SELECT: &str =
    "id:advertiser_id,name,email,phone,company:companies(company_id,company_name,address,phone,url)";
const PARTNER_SELECT: &str =
    "id:partner_id,name,email,phone,company:companies(company_id,company_name,address,phone,url)";
const CONTRACT_SELECT: &str =
    "contract_id,contract_name,vertical:verticals(vertical_id,vertical_name)";

type Params = Vec<(String, String)>;

fn param(key: &str, value: impl Into<String>) -> (String, String) {
    (key.to_string(), value.into())
}

/// Client for the hosted backend's PostgREST interface (`/rest/v1/<table>`).
pub struct RestBackend {
    base_url: String,
    api_key: String,
    agent: Agent,
}

/// Error body returned by PostgREST on non-2xx responses.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    details: Option<String>,
}

#[derive(Serialize)]
struct InvoiceUpdate<'a> {
    advertiser_id: Option<i64>,
    partner_id: Option<i64>,
    issued_date: Option<NaiveDate>,
    due_date: Option<NaiveDate>,
    payment_term: Option<PaymentTerm>,
    total_amount: Option<Decimal>,
    invoice_status: InvoiceStatus,
    note: Option<&'a str>,
    tax: Decimal,
    updated_date: Option<DateTime<Utc>>,
}

impl<'a> From<&'a InvoiceRecord> for InvoiceUpdate<'a> {
    fn from(r: &'a InvoiceRecord) -> Self {
        Self {
            advertiser_id: r.advertiser_id,
            partner_id: r.partner_id,
            issued_date: r.issued_date,
            due_date: r.due_date,
            payment_term: r.payment_term,
            total_amount: r.total_amount,
            invoice_status: r.invoice_status,
            note: r.note.as_deref(),
            tax: r.tax,
            updated_date: r.updated_date,
        }
    }
}

#[derive(Serialize)]
struct LineItemUpdate {
    contract_id: Option<i64>,
    retainer: u32,
    unit_price: Decimal,
}

struct RawResponse {
    content_range: Option<String>,
    body: String,
}

impl RestBackend {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(15)))
            .http_status_as_error(false)
            .build()
            .into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            agent,
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.api_key)
    }

    fn finish(
        &self,
        result: std::result::Result<ureq::http::Response<ureq::Body>, ureq::Error>,
    ) -> Result<RawResponse> {
        let mut response = result.map_err(|e| AdminError::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        let content_range = response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| AdminError::Transport(e.to_string()))?;

        if !(200..300).contains(&status) {
            tracing::warn!(status, "backend request failed");
            return Err(AdminError::Backend {
                status,
                message: error_message(&body),
            });
        }
        Ok(RawResponse {
            content_range,
            body,
        })
    }

    fn select<T: DeserializeOwned>(&self, table: &str, params: &Params) -> Result<Vec<T>> {
        tracing::debug!(table, ?params, "select");
        let result = self
            .agent
            .get(self.table_url(table))
            .header("apikey", &self.api_key)
            .header("Authorization", self.bearer())
            .query_pairs(params.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .call();
        let raw = self.finish(result)?;
        parse_json(&raw.body)
    }

    fn select_one<T: DeserializeOwned>(&self, table: &str, params: Params) -> Result<Option<T>> {
        let mut params = params;
        params.push(param("limit", "1"));
        Ok(self.select(table, &params)?.into_iter().next())
    }

    fn select_page<T: DeserializeOwned>(
        &self,
        table: &str,
        params: &Params,
    ) -> Result<(Vec<T>, Option<usize>)> {
        tracing::debug!(table, ?params, "select page");
        let result = self
            .agent
            .get(self.table_url(table))
            .header("apikey", &self.api_key)
            .header("Authorization", self.bearer())
            .header("Prefer", "count=exact")
            .query_pairs(params.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .call();
        let raw = self.finish(result)?;
        let total = raw.content_range.as_deref().and_then(parse_content_range);
        Ok((parse_json(&raw.body)?, total))
    }

    fn patch<B: Serialize>(&self, table: &str, filter: (String, String), body: &B) -> Result<()> {
        tracing::debug!(table, filter = %filter.1, "patch");
        let payload = serde_json::to_string(body).map_err(|e| AdminError::Payload(e.to_string()))?;
        let result = self
            .agent
            .patch(self.table_url(table))
            .header("apikey", &self.api_key)
            .header("Authorization", self.bearer())
            .header("Content-Type", "application/json")
            .query(&filter.0, &filter.1)
            .send(payload);
        self.finish(result)?;
        Ok(())
    }

    fn insert<B: Serialize, T: DeserializeOwned>(&self, table: &str, body: &B) -> Result<T> {
        tracing::debug!(table, "insert");
        let payload = serde_json::to_string(body).map_err(|e| AdminError::Payload(e.to_string()))?;
        let result = self
            .agent
            .post(self.table_url(table))
            .header("apikey", &self.api_key)
            .header("Authorization", self.bearer())
            .header("Content-Type", "application/json")
            .header("Prefer", "return=representation")
            .send(payload);
        let raw = self.finish(result)?;
        let rows: Vec<T> = parse_json(&raw.body)?;
        rows.into_iter()
            .next()
            .ok_or_else(|| AdminError::Payload(format!("insert into '{table}' returned no row")))
    }

    fn delete(&self, table: &str, filter: (String, String)) -> Result<()> {
        tracing::debug!(table, filter = %filter.1, "delete");
        let result = self
            .agent
            .delete(self.table_url(table))
            .header("apikey", &self.api_key)
            .header("Authorization", self.bearer())
            .query(&filter.0, &filter.1)
            .call();
        self.finish(result)?;
        Ok(())
    }

    fn search_parties(
        &self,
        table: &str,
        select: &str,
        prefix: &str,
        limit: usize,
    ) -> Result<Vec<BillingParty>> {
        self.select(
            table,
            &vec![
                param("select", select),
                param("name", ilike_pattern(prefix)),
                param("order", "name.asc"),
                param("limit", limit.to_string()),
            ],
        )
    }
}

fn eq(column: &str, value: impl std::fmt::Display) -> (String, String) {
    param(column, format!("eq.{value}"))
}

fn parse_json<T: DeserializeOwned>(body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|e| AdminError::Payload(e.to_string()))
}

fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            message: Some(message),
            details,
        }) => match details {
            Some(details) if !details.is_empty() => format!("{message} ({details})"),
            _ => message,
        },
        _ if body.trim().is_empty() => "no response body".to_string(),
        _ => body.trim().to_string(),
    }
}

/// PostgREST pattern for a case-insensitive prefix match.
fn ilike_pattern(prefix: &str) -> String {
    let escaped: String = prefix
        .trim()
        .chars()
        .filter(|c| !matches!(c, '*' | '%' | ',' | '(' | ')'))
        .collect();
    format!("ilike.{escaped}*")
}

/// Total row count from a `Content-Range: 0-9/47` header.
fn parse_content_range(value: &str) -> Option<usize> {
    value.rsplit_once('/')?.1.trim().parse().ok()
}

/// Query parameters selecting one page of the invoice list.
fn invoice_query_params(query: &InvoiceQuery) -> Params {
    let mut params = vec![param("select", "*"), param("order", "invoice_id.desc")];
    if let Some(status) = query.status {
        params.push(eq("invoice_status", status));
    }
    if let Some(id) = query.id_match {
        params.push(eq("invoice_id", id));
    }
    if let Some(from) = query.from {
        params.push(param("issued_date", format!("gte.{from}")));
    }
    if let Some(to) = query.to {
        params.push(param("issued_date", format!("lte.{to}")));
    }
    params.push(param("offset", query.offset().to_string()));
    params.push(param("limit", query.page_size.max(1).to_string()));
    params
}

impl Backend for RestBackend {
    fn invoice(&self, invoice_id: i64) -> Result<Option<InvoiceRecord>> {
        self.select_one(
            "invoices",
            vec![param("select", "*"), eq("invoice_id", invoice_id)],
        )
    }

    fn list_invoices(&self, query: &InvoiceQuery) -> Result<Page<InvoiceRecord>> {
        let (rows, total) = self.select_page("invoices", &invoice_query_params(query))?;
        let total_count = total.unwrap_or(query.offset() + rows.len());
        Ok(Page {
            rows,
            total_count,
            page: query.page,
            page_size: query.page_size.max(1),
        })
    }

    fn update_invoice(&self, record: &InvoiceRecord) -> Result<()> {
        self.patch(
            "invoices",
            eq("invoice_id", record.invoice_id),
            &InvoiceUpdate::from(record),
        )
    }

    fn line_items(&self, invoice_id: i64) -> Result<Vec<LineItemRecord>> {
        self.select(
            "invoice_items",
            &vec![
                param("select", "id,invoice_id,contract_id,retainer,unit_price"),
                eq("invoice_id", invoice_id),
                param("order", "id.asc"),
            ],
        )
    }

    fn update_line_item(&self, item: &LineItemRecord) -> Result<()> {
        self.patch(
            "invoice_items",
            eq("id", item.id),
            &LineItemUpdate {
                contract_id: item.contract_id,
                retainer: item.retainer,
                unit_price: item.unit_price,
            },
        )
    }

    fn advertiser(&self, advertiser_id: i64) -> Result<Option<BillingParty>> {
        self.select_one(
            "advertisers",
            vec![
                param("select", ADVERTISER_SELECT),
                eq("advertiser_id", advertiser_id),
            ],
        )
    }

    fn partner(&self, partner_id: i64) -> Result<Option<BillingParty>> {
        self.select_one(
            "partners",
            vec![param("select", PARTNER_SELECT), eq("partner_id", partner_id)],
        )
    }

    fn contract(&self, contract_id: i64) -> Result<Option<ContractSummary>> {
        self.select_one(
            "contracts",
            vec![
                param("select", CONTRACT_SELECT),
                eq("contract_id", contract_id),
            ],
        )
    }

    fn search_advertisers(&self, prefix: &str, limit: usize) -> Result<Vec<BillingParty>> {
        self.search_parties("advertisers", ADVERTISER_SELECT, prefix, limit)
    }

    fn search_partners(&self, prefix: &str, limit: usize) -> Result<Vec<BillingParty>> {
        self.search_parties("partners", PARTNER_SELECT, prefix, limit)
    }

    fn search_contracts(&self, prefix: &str, limit: usize) -> Result<Vec<ContractSummary>> {
        self.select(
            "contracts",
            &vec![
                param("select", CONTRACT_SELECT),
                param("contract_name", ilike_pattern(prefix)),
                param("order", "contract_name.asc"),
                param("limit", limit.to_string()),
            ],
        )
    }

    fn insert_company(&self, company: &NewCompany) -> Result<Company> {
        self.insert("companies", company)
    }

    fn delete_company(&self, company_id: i64) -> Result<()> {
        self.delete("companies", eq("company_id", company_id))
    }

    fn insert_advertiser(&self, advertiser: &NewAdvertiser) -> Result<AdvertiserRecord> {
        self.insert("advertisers", advertiser)
    }

    fn delete_advertiser(&self, advertiser_id: i64) -> Result<()> {
        self.delete("advertisers", eq("advertiser_id", advertiser_id))
    }

    fn insert_contract(&self, contract: &NewContract) -> Result<ContractRecord> {
        self.insert("contracts", contract)
    }

    fn delete_contract(&self, contract_id: i64) -> Result<()> {
        self.delete("contracts", eq("contract_id", contract_id))
    }

    fn leads(&self) -> Result<Vec<Lead>> {
        self.select(
            "leads",
            &vec![param("select", "*"), param("order", "created_date.desc")],
        )
    }
}
