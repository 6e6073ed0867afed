use std::path::PathBuf;
use thiserror::Error;

use crate::invoice::ValidationIssue;
use crate::model::InvoiceStatus;

#[derive(Error, Debug)]
pub enum AdminError {
    #[error("Config directory not found at {0}. Run 'adops init' to create it.")]
    ConfigNotFound(PathBuf),

    #[error("Config file not found: {0}")]
    ConfigFileNotFound(PathBuf),

    #[error("Failed to parse {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Config directory already exists at {0}")]
    AlreadyInitialized(PathBuf),

    #[error("Environment variable '{0}' with the backend API key is not set")]
    MissingApiKey(String),

    #[error("Invoice {0} not found")]
    InvoiceNotFound(i64),

    #[error("Line item {row} does not belong to invoice {invoice}")]
    LineItemNotFound { invoice: i64, row: i64 },

    #[error("{0}")]
    Validation(ValidationErrors),

    #[error("Invoice {invoice} is {status} and can only be sent from Draft")]
    NotSendable { invoice: i64, status: InvoiceStatus },

    #[error("Invoice {invoice} is {status} and can no longer be edited")]
    NotEditable { invoice: i64, status: InvoiceStatus },

    #[error("Invalid tax rate '{0}': must be between 0 and 100")]
    InvalidTax(String),

    #[error("Invalid line edit '{0}'. Expected 'row:retainer:price[:contract]' (e.g., '7:10:50')")]
    InvalidLineFormat(String),

    #[error("Invalid {field} value '{value}': {reason}")]
    InvalidArgument {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("Editor is {actual}, expected {expected}")]
    EditorState {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Backend request failed ({status}): {message}")]
    Backend { status: u16, message: String },

    #[error("Backend unreachable: {0}")]
    Transport(String),

    #[error("Unexpected backend payload: {0}")]
    Payload(String),

    #[error("Save aborted at step {step} ({action}): {source}{}", rollback_note(.step, .rolled_back))]
    SaveAborted {
        step: usize,
        action: String,
        rolled_back: bool,
        #[source]
        source: Box<AdminError>,
    },

    #[error("Role '{role}' is not allowed to {action}")]
    Forbidden { role: String, action: &'static str },

    #[error("Typst not found. Install it from https://typst.app/ or run: cargo install typst-cli")]
    TypstNotFound,

    #[error("Failed to generate PDF: {0}")]
    PdfGeneration(String),

    #[error("Failed to write store: {0}")]
    StoreWrite(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn rollback_note(step: &usize, rolled_back: &bool) -> &'static str {
    if *step <= 1 {
        ""
    } else if *rolled_back {
        " (earlier steps rolled back)"
    } else {
        " (rollback incomplete, earlier steps may remain committed)"
    }
}

/// Every problem found by one validation pass, reported together.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationErrors(pub Vec<ValidationIssue>);

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let messages: Vec<String> = self.0.iter().map(|i| i.to_string()).collect();
        write!(f, "Invoice is incomplete: {}", messages.join("; "))
    }
}

pub type Result<T> = std::result::Result<T, AdminError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn aborted(step: usize, rolled_back: bool) -> AdminError {
        AdminError::SaveAborted {
            step,
            action: "update invoice 42".to_string(),
            rolled_back,
            source: Box::new(AdminError::Backend {
                status: 503,
                message: "service unavailable".to_string(),
            }),
        }
    }

    #[test]
    fn first_step_failure_has_no_rollback_note() {
        assert_eq!(
            aborted(1, true).to_string(),
            "Save aborted at step 1 (update invoice 42): Backend request failed (503): service unavailable"
        );
    }

    #[test]
    fn later_step_failure_reports_rollback_outcome() {
        assert!(aborted(3, true)
            .to_string()
            .ends_with("(earlier steps rolled back)"));
        assert!(aborted(2, false).to_string().contains("rollback incomplete"));
    }
}
