use serde::{Deserialize, Serialize};

use crate::auth::Role;
use crate::backend::DEFAULT_PAGE_SIZE;
use crate::invoice::TaxMode;

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    pub backend: BackendSettings,
    pub invoice: InvoiceSettings,
    pub pdf: PdfSettings,
    #[serde(default)]
    pub export: ExportSettings,
    #[serde(default)]
    pub auth: AuthSettings,
}

/// Where table rows live.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BackendSettings {
    /// A TOML file holding every table, relative to the config directory.
    Local {
        #[serde(default = "default_store")]
        store: String,
    },
    /// The hosted backend's REST interface.
    Rest {
        url: String,
        /// Name of the environment variable holding the API key.
        #[serde(default = "default_api_key_env")]
        api_key_env: String,
    },
}

#[derive(Debug, Deserialize, Serialize)]
pub struct InvoiceSettings {
    pub currency_symbol: String,
    #[serde(default)]
    pub tax_mode: TaxMode,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct PdfSettings {
    pub output_dir: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ExportSettings {
    pub output_dir: String,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            output_dir: "output".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct AuthSettings {
    pub user: String,
    pub role: Role,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            user: "anonymous".to_string(),
            role: Role::Viewer,
        }
    }
}

fn default_store() -> String {
    "store.toml".to_string()
}

fn default_api_key_env() -> String {
    "ADOPS_API_KEY".to_string()
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}
