mod aggregate;
mod document;
mod editor;
mod list;
mod totals;
mod unit_of_work;
mod validation;

pub use aggregate::{load_aggregate, InvoiceAggregate, ResolvedLine};
pub use document::{
    download_invoice, pdf_file_name, DocumentLine, InvoiceDocument, PartyBlock, RenderSettings,
};
pub use editor::{EditorPhase, InvoiceEditor, LineEdit};
pub use list::{due_label, list_invoices, InvoiceListRow};
pub use totals::{subtotal, TaxMode, Totals};
pub use unit_of_work::UnitOfWork;
pub use validation::{check, validate, ValidationIssue};
