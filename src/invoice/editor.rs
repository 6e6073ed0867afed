use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use std::path::{Path, PathBuf};

use super::aggregate::{load_aggregate, InvoiceAggregate};
use super::document::{download_invoice, RenderSettings};
use super::totals::Totals;
use super::unit_of_work::UnitOfWork;
use super::validation::validate;
use crate::backend::Backend;
use crate::error::{AdminError, Result};
use crate::model::{InvoiceStatus, PaymentTerm};

/// Lifecycle of the editor: `Closed -> Loading -> Editing -> Submitting -> Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorPhase {
    Closed,
    Loading,
    Editing,
    Submitting,
}

impl EditorPhase {
    pub fn name(&self) -> &'static str {
        match self {
            EditorPhase::Closed => "closed",
            EditorPhase::Loading => "loading",
            EditorPhase::Editing => "editing",
            EditorPhase::Submitting => "submitting",
        }
    }
}

/// Changes to one line item. `None` leaves the field as it is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineEdit {
    pub retainer: Option<u32>,
    pub unit_price: Option<Decimal>,
    pub contract_id: Option<i64>,
}

/// Loads one invoice, holds local edits, and writes them back on save/send.
///
/// Nothing reaches the backend before `save` or `send`, and both validate
/// first. Writes go header first, then each line item, inside a
/// [`UnitOfWork`] so a failed step rolls back the earlier ones.
pub struct InvoiceEditor<'a> {
    backend: &'a dyn Backend,
    render: RenderSettings,
    phase: EditorPhase,
    draft: Option<InvoiceAggregate>,
    original: Option<InvoiceAggregate>,
}

impl<'a> InvoiceEditor<'a> {
    pub fn new(backend: &'a dyn Backend, render: RenderSettings) -> Self {
        Self {
            backend,
            render,
            phase: EditorPhase::Closed,
            draft: None,
            original: None,
        }
    }

    pub fn phase(&self) -> EditorPhase {
        self.phase
    }

    pub fn invoice(&self) -> Option<&InvoiceAggregate> {
        self.draft.as_ref()
    }

    /// Totals of the local draft, including unsaved edits.
    pub fn totals(&self) -> Option<Totals> {
        self.draft
            .as_ref()
            .map(|draft| draft.totals(self.render.tax_mode))
    }

    pub fn open(&mut self, invoice_id: i64) -> Result<&InvoiceAggregate> {
        self.expect(EditorPhase::Closed)?;
        self.phase = EditorPhase::Loading;
        match load_aggregate(self.backend, invoice_id) {
            Ok(aggregate) => {
                self.original = Some(aggregate.clone());
                self.phase = EditorPhase::Editing;
                Ok(self.draft.insert(aggregate))
            }
            Err(e) => {
                self.phase = EditorPhase::Closed;
                Err(e)
            }
        }
    }

    /// Discard local edits.
    pub fn close(&mut self) {
        self.draft = None;
        self.original = None;
        self.phase = EditorPhase::Closed;
    }

    pub fn set_tax(&mut self, percent: Decimal) -> Result<()> {
        if percent < Decimal::ZERO || percent > Decimal::ONE_HUNDRED {
            return Err(AdminError::InvalidTax(percent.to_string()));
        }
        self.editable()?.header.tax = percent;
        Ok(())
    }

    pub fn set_advertiser(&mut self, advertiser_id: i64) -> Result<()> {
        self.editable()?;
        let party = self
            .backend
            .advertiser(advertiser_id)?
            .ok_or_else(|| not_found("advertiser", advertiser_id))?;
        let draft = self.editable()?;
        draft.header.advertiser_id = Some(advertiser_id);
        draft.advertiser = Some(party);
        Ok(())
    }

    pub fn set_partner(&mut self, partner_id: i64) -> Result<()> {
        self.editable()?;
        let party = self
            .backend
            .partner(partner_id)?
            .ok_or_else(|| not_found("partner", partner_id))?;
        let draft = self.editable()?;
        draft.header.partner_id = Some(partner_id);
        draft.partner = Some(party);
        Ok(())
    }

    pub fn set_due_date(&mut self, due: NaiveDate) -> Result<()> {
        self.editable()?.header.due_date = Some(due);
        Ok(())
    }

    /// Set the payment term; a missing due date is derived from the issued date.
    pub fn set_payment_term(&mut self, term: PaymentTerm) -> Result<()> {
        let header = &mut self.editable()?.header;
        header.payment_term = Some(term);
        if header.due_date.is_none() {
            header.due_date = header.issued_date.map(|issued| term.due_date_from(issued));
        }
        Ok(())
    }

    pub fn set_note(&mut self, note: Option<String>) -> Result<()> {
        self.editable()?.header.note = note.filter(|n| !n.trim().is_empty());
        Ok(())
    }

    pub fn update_line(&mut self, row_id: i64, edit: LineEdit) -> Result<()> {
        if let Some(price) = edit.unit_price.filter(|p| *p < Decimal::ZERO) {
            return Err(AdminError::InvalidArgument {
                field: "unit price",
                value: price.to_string(),
                reason: "must not be negative".to_string(),
            });
        }
        let invoice_id = self.editable()?.id();
        let index = self
            .editable()?
            .lines
            .iter()
            .position(|l| l.item.id == row_id)
            .ok_or(AdminError::LineItemNotFound {
                invoice: invoice_id,
                row: row_id,
            })?;

        let contract = match edit.contract_id {
            Some(id) => Some(
                self.backend
                    .contract(id)?
                    .ok_or_else(|| not_found("contract", id))?,
            ),
            None => None,
        };

        let line = &mut self.editable()?.lines[index];
        let mut item = line.item.clone();
        if let Some(retainer) = edit.retainer {
            item.retainer = retainer;
        }
        if let Some(price) = edit.unit_price {
            item.unit_price = price;
        }
        if item.checked_line_total().is_none() {
            return Err(AdminError::InvalidArgument {
                field: "unit price",
                value: item.unit_price.to_string(),
                reason: format!("line total of {} retainers is out of range", item.retainer),
            });
        }
        line.item = item;
        if let Some(contract) = contract {
            line.item.contract_id = Some(contract.contract_id);
            line.contract = Some(contract);
        }
        Ok(())
    }

    /// Validate and persist the draft without changing its status.
    pub fn save(&mut self) -> Result<InvoiceAggregate> {
        let draft = self.editable()?;
        validate(draft)?;
        let target = draft.clone();
        self.persist(target)
    }

    /// Validate, mark as `Sent` and persist. Only drafts can be sent.
    pub fn send(&mut self) -> Result<InvoiceAggregate> {
        let draft = self.editable()?;
        let status = draft.header.invoice_status;
        if !status.can_send() {
            return Err(AdminError::NotSendable {
                invoice: draft.id(),
                status,
            });
        }
        validate(draft)?;
        let mut target = draft.clone();
        target.header.invoice_status = InvoiceStatus::Sent;
        self.persist(target)
    }

    /// Render the persisted invoice, ignoring unsaved edits.
    pub fn download(&self, output_dir: &Path) -> Result<PathBuf> {
        self.expect(EditorPhase::Editing)?;
        let id = self
            .draft
            .as_ref()
            .map(InvoiceAggregate::id)
            .ok_or_else(|| self.state_error(EditorPhase::Editing))?;
        download_invoice(self.backend, id, &self.render, output_dir)
    }

    fn persist(&mut self, mut target: InvoiceAggregate) -> Result<InvoiceAggregate> {
        let original = self
            .original
            .clone()
            .ok_or_else(|| self.state_error(EditorPhase::Editing))?;

        let totals = target.totals(self.render.tax_mode);
        target.header.total_amount = Some(totals.total);
        target.header.updated_date = Some(Utc::now());

        self.phase = EditorPhase::Submitting;
        tracing::info!(
            invoice_id = target.id(),
            status = %target.header.invoice_status,
            lines = target.lines.len(),
            "saving invoice"
        );

        match write_aggregate(self.backend, &target, &original) {
            Ok(()) => {
                self.close();
                Ok(target)
            }
            Err(e) => {
                self.phase = EditorPhase::Editing;
                Err(e)
            }
        }
    }

    fn expect(&self, phase: EditorPhase) -> Result<()> {
        if self.phase == phase {
            Ok(())
        } else {
            Err(self.state_error(phase))
        }
    }

    fn state_error(&self, expected: EditorPhase) -> AdminError {
        AdminError::EditorState {
            expected: expected.name(),
            actual: self.phase.name(),
        }
    }

    fn editable(&mut self) -> Result<&mut InvoiceAggregate> {
        self.expect(EditorPhase::Editing)?;
        let error = self.state_error(EditorPhase::Editing);
        let draft = self.draft.as_mut().ok_or(error)?;
        let status = draft.header.invoice_status;
        if !status.is_editable() {
            return Err(AdminError::NotEditable {
                invoice: draft.id(),
                status,
            });
        }
        Ok(draft)
    }
}

fn not_found(field: &'static str, id: i64) -> AdminError {
    AdminError::InvalidArgument {
        field,
        value: id.to_string(),
        reason: format!("no {field} with that id"),
    }
}

/// Header first, then every line item, each as its own request.
fn write_aggregate(
    backend: &dyn Backend,
    target: &InvoiceAggregate,
    original: &InvoiceAggregate,
) -> Result<()> {
    let mut work = UnitOfWork::new(backend);
    work.update_invoice(&target.header, &original.header)?;
    for line in &target.lines {
        let previous = original
            .lines
            .iter()
            .find(|l| l.item.id == line.item.id)
            .map(|l| &l.item)
            .unwrap_or(&line.item);
        work.update_line_item(&line.item, previous)?;
    }
    work.commit();
    Ok(())
}
