//! Row and join types shared by the backends and the invoice workflow.

mod contract;
mod invoice;
mod lead;
mod party;

pub use contract::{ContractRecord, ContractSummary, NewContract, Vertical};
pub use invoice::{InvoiceAction, InvoiceRecord, InvoiceStatus, LineItemRecord, PaymentTerm};
pub use lead::Lead;
pub use party::{AdvertiserRecord, BillingParty, Company, NewAdvertiser, NewCompany, PartnerRecord};
