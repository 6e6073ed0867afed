use rust_decimal_macros::dec;
use std::cell::{Cell, RefCell};
use std::fs;
use tempfile::TempDir;

use adops::backend::{Backend, InvoiceQuery, LocalStore, Page};
use adops::invoice::{list_invoices, EditorPhase, InvoiceEditor, LineEdit, RenderSettings, TaxMode};
use adops::model::{
    AdvertiserRecord, BillingParty, Company, ContractRecord, ContractSummary, InvoiceAction,
    InvoiceRecord, InvoiceStatus, Lead, LineItemRecord, NewAdvertiser, NewCompany, NewContract,
};
use adops::onboarding::{onboard_advertiser, AdvertiserSignup, ContractTerms};
use adops::{AdminError, Result};

const STORE: &str = r#"
[[companies]]
company_id = 1
company_name = "Hart & Cole LLP"

[[advertisers]]
advertiser_id = 1
name = "John Hart"
company_id = 1

[[partners]]
partner_id = 1
name = "LeadBridge"

[[verticals]]
vertical_id = 1
vertical_name = "Personal Injury"

[[contracts]]
contract_id = 1
contract_name = "PI Texas Q1"
advertiser_id = 1
vertical_id = 1

[[invoices]]
invoice_id = 42
advertiser_id = 1
partner_id = 1
issued_date = "2026-01-10"
due_date = "2026-02-09"
invoice_status = "Draft"
tax = "21"

[[invoices]]
invoice_id = 43
advertiser_id = 1
issued_date = "2026-01-12"
invoice_status = "Draft"
tax = "0"

[[invoices]]
invoice_id = 44
advertiser_id = 1
partner_id = 1
due_date = "2025-12-02"
invoice_status = "Paid"
tax = "0"

[[invoice_items]]
id = 7
invoice_id = 42
contract_id = 1
retainer = 10
unit_price = "50"

[[invoice_items]]
id = 8
invoice_id = 42
contract_id = 1
retainer = 2
unit_price = "25"

[[invoice_items]]
id = 9
invoice_id = 43
contract_id = 1
retainer = 2
unit_price = "100"
"#;

fn store() -> (TempDir, LocalStore) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("store.toml");
    fs::write(&path, STORE).unwrap();
    (dir, LocalStore::new(path))
}

fn render() -> RenderSettings {
    RenderSettings {
        currency_symbol: "$".to_string(),
        tax_mode: TaxMode::Deduct,
    }
}

/// Delegates to a local store, counting writes and failing on request.
struct Flaky {
    inner: LocalStore,
    writes: Cell<usize>,
    fail_line_item: Option<i64>,
    fail_invoice_restore: bool,
    invoice_updates: RefCell<Vec<InvoiceRecord>>,
}

impl Flaky {
    fn new(inner: LocalStore) -> Self {
        Self {
            inner,
            writes: Cell::new(0),
            fail_line_item: None,
            fail_invoice_restore: false,
            invoice_updates: RefCell::new(Vec::new()),
        }
    }

    fn write(&self) {
        self.writes.set(self.writes.get() + 1);
    }
}

fn unavailable() -> AdminError {
    AdminError::Backend {
        status: 503,
        message: "service unavailable".to_string(),
    }
}

impl Backend for Flaky {
    fn invoice(&self, invoice_id: i64) -> Result<Option<InvoiceRecord>> {
        self.inner.invoice(invoice_id)
    }

    fn list_invoices(&self, query: &InvoiceQuery) -> Result<Page<InvoiceRecord>> {
        self.inner.list_invoices(query)
    }

    fn update_invoice(&self, record: &InvoiceRecord) -> Result<()> {
        self.write();
        let restoring = !self.invoice_updates.borrow().is_empty();
        self.invoice_updates.borrow_mut().push(record.clone());
        if restoring && self.fail_invoice_restore {
            return Err(unavailable());
        }
        self.inner.update_invoice(record)
    }

    fn line_items(&self, invoice_id: i64) -> Result<Vec<LineItemRecord>> {
        self.inner.line_items(invoice_id)
    }

    fn update_line_item(&self, item: &LineItemRecord) -> Result<()> {
        self.write();
        if self.fail_line_item == Some(item.id) {
            return Err(unavailable());
        }
        self.inner.update_line_item(item)
    }

    fn advertiser(&self, advertiser_id: i64) -> Result<Option<BillingParty>> {
        self.inner.advertiser(advertiser_id)
    }

    fn partner(&self, partner_id: i64) -> Result<Option<BillingParty>> {
        self.inner.partner(partner_id)
    }

    fn contract(&self, contract_id: i64) -> Result<Option<ContractSummary>> {
        self.inner.contract(contract_id)
    }

    fn search_advertisers(&self, prefix: &str, limit: usize) -> Result<Vec<BillingParty>> {
        self.inner.search_advertisers(prefix, limit)
    }

    fn search_partners(&self, prefix: &str, limit: usize) -> Result<Vec<BillingParty>> {
        self.inner.search_partners(prefix, limit)
    }

    fn search_contracts(&self, prefix: &str, limit: usize) -> Result<Vec<ContractSummary>> {
        self.inner.search_contracts(prefix, limit)
    }

    fn insert_company(&self, company: &NewCompany) -> Result<Company> {
        self.write();
        self.inner.insert_company(company)
    }

    fn delete_company(&self, company_id: i64) -> Result<()> {
        self.write();
        self.inner.delete_company(company_id)
    }

    fn insert_advertiser(&self, advertiser: &NewAdvertiser) -> Result<AdvertiserRecord> {
        self.write();
        self.inner.insert_advertiser(advertiser)
    }

    fn delete_advertiser(&self, advertiser_id: i64) -> Result<()> {
        self.write();
        self.inner.delete_advertiser(advertiser_id)
    }

    fn insert_contract(&self, contract: &NewContract) -> Result<ContractRecord> {
        self.write();
        self.inner.insert_contract(contract)
    }

    fn delete_contract(&self, contract_id: i64) -> Result<()> {
        self.write();
        self.inner.delete_contract(contract_id)
    }

    fn leads(&self) -> Result<Vec<Lead>> {
        self.inner.leads()
    }
}

#[test]
fn open_resolves_joins_and_totals() {
    let (_dir, store) = store();
    let mut editor = InvoiceEditor::new(&store, render());

    let invoice = editor.open(42).unwrap();
    assert_eq!(invoice.lines.len(), 2);
    assert_eq!(
        invoice.advertiser.as_ref().map(|a| a.name.as_str()),
        Some("John Hart")
    );
    assert_eq!(editor.phase(), EditorPhase::Editing);

    let totals = editor.totals().unwrap();
    assert_eq!(totals.subtotal, dec!(550));
    assert_eq!(totals.total, dec!(434.50));
}

#[test]
fn open_unknown_invoice_returns_to_closed() {
    let (_dir, store) = store();
    let mut editor = InvoiceEditor::new(&store, render());

    assert!(matches!(
        editor.open(999),
        Err(AdminError::InvoiceNotFound(999))
    ));
    assert_eq!(editor.phase(), EditorPhase::Closed);
}

#[test]
fn incomplete_invoice_is_not_sent_and_nothing_is_written() {
    let (_dir, store) = store();
    let backend = Flaky::new(store);
    let mut editor = InvoiceEditor::new(&backend, render());
    editor.open(43).unwrap();

    let err = editor.send().unwrap_err();
    let AdminError::Validation(issues) = &err else {
        panic!("expected validation error, got {err}");
    };
    assert_eq!(issues.0.len(), 2);
    assert_eq!(backend.writes.get(), 0);
    assert_eq!(editor.phase(), EditorPhase::Editing);
}

#[test]
fn unchanged_save_keeps_subtotal() {
    let (_dir, store) = store();
    let mut editor = InvoiceEditor::new(&store, render());
    editor.open(42).unwrap();
    let saved = editor.save().unwrap();
    assert_eq!(editor.phase(), EditorPhase::Closed);
    assert_eq!(saved.header.total_amount, Some(dec!(434.50)));

    let items = store.line_items(42).unwrap();
    let subtotal: rust_decimal::Decimal = items.iter().map(|i| i.line_total()).sum();
    assert_eq!(subtotal, dec!(550));
    let header = store.invoice(42).unwrap().unwrap();
    assert_eq!(header.invoice_status, InvoiceStatus::Draft);
    assert!(header.updated_date.is_some());
}

#[test]
fn send_marks_draft_as_sent_and_rejects_a_second_send() {
    let (_dir, store) = store();
    let mut editor = InvoiceEditor::new(&store, render());
    editor.open(42).unwrap();
    editor.set_tax(dec!(10)).unwrap();
    let sent = editor.send().unwrap();
    assert_eq!(sent.header.invoice_status, InvoiceStatus::Sent);
    assert_eq!(sent.header.total_amount, Some(dec!(495)));

    let mut editor = InvoiceEditor::new(&store, render());
    editor.open(42).unwrap();
    assert!(matches!(
        editor.send(),
        Err(AdminError::NotSendable {
            invoice: 42,
            status: InvoiceStatus::Sent
        })
    ));
}

#[test]
fn paid_invoice_cannot_be_edited() {
    let (_dir, store) = store();
    let mut editor = InvoiceEditor::new(&store, render());
    editor.open(44).unwrap();

    assert!(matches!(
        editor.set_tax(dec!(5)),
        Err(AdminError::NotEditable { invoice: 44, .. })
    ));
    assert!(matches!(
        editor.save(),
        Err(AdminError::NotEditable { invoice: 44, .. })
    ));
}

#[test]
fn update_line_rejects_rows_of_other_invoices() {
    let (_dir, store) = store();
    let mut editor = InvoiceEditor::new(&store, render());
    editor.open(42).unwrap();

    let edit = LineEdit {
        retainer: Some(1),
        ..Default::default()
    };
    assert!(matches!(
        editor.update_line(9, edit),
        Err(AdminError::LineItemNotFound { invoice: 42, row: 9 })
    ));
}

#[test]
fn update_line_rejects_totals_that_overflow() {
    let (_dir, store) = store();
    let mut editor = InvoiceEditor::new(&store, render());
    editor.open(42).unwrap();

    let edit = LineEdit {
        retainer: Some(u32::MAX),
        unit_price: Some(rust_decimal::Decimal::MAX),
        contract_id: None,
    };
    assert!(matches!(
        editor.update_line(7, edit),
        Err(AdminError::InvalidArgument { field: "unit price", .. })
    ));
    assert_eq!(editor.totals().unwrap().subtotal, dec!(550));
}

#[test]
fn failed_line_item_write_restores_the_header() {
    let (_dir, store) = store();
    let mut backend = Flaky::new(store);
    backend.fail_line_item = Some(8);

    let mut editor = InvoiceEditor::new(&backend, render());
    editor.open(42).unwrap();
    editor.set_tax(dec!(50)).unwrap();
    editor
        .update_line(
            7,
            LineEdit {
                retainer: Some(1),
                ..Default::default()
            },
        )
        .unwrap();

    let err = editor.save().unwrap_err();
    assert!(matches!(
        err,
        AdminError::SaveAborted {
            step: 3,
            rolled_back: true,
            ..
        }
    ));
    assert_eq!(editor.phase(), EditorPhase::Editing);

    let header = backend.inner.invoice(42).unwrap().unwrap();
    assert_eq!(header.tax, dec!(21));
    let items = backend.inner.line_items(42).unwrap();
    assert_eq!(items.iter().find(|i| i.id == 7).unwrap().retainer, 10);
}

#[test]
fn failed_compensation_is_reported() {
    let (_dir, store) = store();
    let mut backend = Flaky::new(store);
    backend.fail_line_item = Some(7);
    backend.fail_invoice_restore = true;

    let mut editor = InvoiceEditor::new(&backend, render());
    editor.open(42).unwrap();
    let err = editor.save().unwrap_err();

    assert!(matches!(
        err,
        AdminError::SaveAborted {
            rolled_back: false,
            ..
        }
    ));
    assert!(err.to_string().contains("rollback incomplete"));
}

#[test]
fn onboarding_rolls_back_when_the_contract_fails() {
    let (_dir, store) = store();
    let signup = AdvertiserSignup {
        name: "Zed Lowe".to_string(),
        email: None,
        phone: None,
        company: NewCompany {
            company_name: "Lowe Legal".to_string(),
            address: None,
            phone: None,
            url: None,
        },
        contract: Some(ContractTerms {
            contract_name: "PI Ohio".to_string(),
            vertical_id: 9,
            budget_limit: None,
        }),
    };

    let err = onboard_advertiser(&store, &signup).unwrap_err();
    assert!(matches!(err, AdminError::SaveAborted { step: 3, .. }));
    assert!(store.search_advertisers("zed", 20).unwrap().is_empty());
    let data = store.load().unwrap();
    assert!(data.companies.iter().all(|c| c.company_name != "Lowe Legal"));
}

#[test]
fn list_rows_carry_totals_and_actions() {
    let (_dir, store) = store();
    let page = list_invoices(&store, &InvoiceQuery::default(), TaxMode::Deduct).unwrap();

    assert_eq!(page.total_count, 3);
    let ids: Vec<i64> = page.rows.iter().map(|r| r.record.invoice_id).collect();
    assert_eq!(ids, vec![44, 43, 42]);

    let paid = &page.rows[0];
    assert_eq!(paid.actions, vec![InvoiceAction::Download]);
    let draft = &page.rows[2];
    assert_eq!(draft.advertiser.as_deref(), Some("John Hart"));
    assert_eq!(draft.totals.total, dec!(434.50));
    assert_eq!(
        draft.actions,
        vec![InvoiceAction::Download, InvoiceAction::Edit, InvoiceAction::Send]
    );
}
