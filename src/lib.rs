pub mod auth;
pub mod backend;
pub mod config;
pub mod error;
pub mod export;
pub mod format;
pub mod invoice;
pub mod model;
pub mod onboarding;
pub mod pdf;

pub use auth::{AuthContext, Role};
pub use backend::{Backend, InvoiceQuery, LocalStore, Page, RestBackend};
pub use config::{Config, BackendSettings};
pub use error::{AdminError, Result};
pub use invoice::{InvoiceAggregate, InvoiceEditor, RenderSettings, TaxMode};
