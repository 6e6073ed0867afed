use rust_decimal::Decimal;
use std::fmt;

use super::aggregate::InvoiceAggregate;
use crate::error::{AdminError, Result, ValidationErrors};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    MissingAdvertiser,
    MissingPartner,
    MissingDueDate,
    LineMissingContract { row: i64 },
    LineZeroTotal { row: i64 },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::MissingAdvertiser => f.write_str("advertiser is not set"),
            ValidationIssue::MissingPartner => f.write_str("partner is not set"),
            ValidationIssue::MissingDueDate => f.write_str("due date is not set"),
            ValidationIssue::LineMissingContract { row } => {
                write!(f, "line {row} has no contract")
            }
            ValidationIssue::LineZeroTotal { row } => write!(f, "line {row} totals zero"),
        }
    }
}

/// Every reason the invoice cannot be saved or sent yet.
pub fn check(invoice: &InvoiceAggregate) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let header = &invoice.header;

    if header.advertiser_id.is_none() {
        issues.push(ValidationIssue::MissingAdvertiser);
    }
    if header.partner_id.is_none() {
        issues.push(ValidationIssue::MissingPartner);
    }
    if header.due_date.is_none() {
        issues.push(ValidationIssue::MissingDueDate);
    }

    for line in &invoice.lines {
        let item = &line.item;
        if item.contract_id.is_none() {
            issues.push(ValidationIssue::LineMissingContract { row: item.id });
        }
        if item.line_total() == Decimal::ZERO {
            issues.push(ValidationIssue::LineZeroTotal { row: item.id });
        }
    }

    issues
}

pub fn validate(invoice: &InvoiceAggregate) -> Result<()> {
    let issues = check(invoice);
    if issues.is_empty() {
        Ok(())
    } else {
        Err(AdminError::Validation(ValidationErrors(issues)))
    }
}
