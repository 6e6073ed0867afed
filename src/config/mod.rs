mod settings;

pub use settings::{
    AuthSettings, BackendSettings, Config, ExportSettings, InvoiceSettings, PdfSettings,
};

use crate::backend::{Backend, LocalStore, RestBackend};
use crate::error::{AdminError, Result};
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};

/// Get the config directory path (XDG config dir, or ~/.adops/)
pub fn config_dir() -> Result<PathBuf> {
    if let Some(proj_dirs) = ProjectDirs::from("", "", "adops") {
        return Ok(proj_dirs.config_dir().to_path_buf());
    }

    let home = dirs_home().ok_or_else(|| {
        AdminError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Could not determine home directory",
        ))
    })?;

    Ok(home.join(".adops"))
}

fn dirs_home() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

/// Expand ~ in paths
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs_home() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Resolve a configured directory; relative paths are taken from the config dir.
pub fn resolve_output_dir(configured: &str, cfg_dir: &Path) -> PathBuf {
    let path = expand_path(configured);
    if path.is_absolute() {
        path
    } else {
        cfg_dir.join(path)
    }
}

/// Load the main config.toml
pub fn load_config(config_dir: &Path) -> Result<Config> {
    if !config_dir.exists() {
        return Err(AdminError::ConfigNotFound(config_dir.to_path_buf()));
    }
    let path = config_dir.join("config.toml");
    if !path.exists() {
        return Err(AdminError::ConfigFileNotFound(path));
    }
    let content = fs::read_to_string(&path)?;
    toml::from_str(&content).map_err(|e| AdminError::ConfigParse { path, source: e })
}

/// Build the backend named in `[backend]`.
pub fn open_backend(config_dir: &Path, config: &Config) -> Result<Box<dyn Backend>> {
    match &config.backend {
        BackendSettings::Local { store } => {
            let path = resolve_output_dir(store, config_dir);
            tracing::debug!(path = %path.display(), "using local store");
            Ok(Box::new(LocalStore::new(path)))
        }
        BackendSettings::Rest { url, api_key_env } => {
            let api_key = std::env::var(api_key_env)
                .map_err(|_| AdminError::MissingApiKey(api_key_env.clone()))?;
            tracing::debug!(%url, "using rest backend");
            Ok(Box::new(RestBackend::new(url, &api_key)))
        }
    }
}

/// Template content for config.toml
pub const CONFIG_TEMPLATE: &str = r#"[backend]
kind = "local"            # "local" (store.toml) or "rest" (hosted backend)
store = "store.toml"
# kind = "rest"
# url = "https://your-project.example.com"
# api_key_env = "ADOPS_API_KEY"

[invoice]
currency_symbol = "$"
tax_mode = "deduct"       # "deduct": total = subtotal * (1 - tax/100); "add": subtotal * (1 + tax/100)
page_size = 10

[pdf]
output_dir = "output"

[export]
output_dir = "output"

[auth]
user = "ops@example.com"
role = "admin"            # admin, manager or viewer
"#;

/// Template content for store.toml
pub const STORE_TEMPLATE: &str = r#"# Local tables used when [backend] kind = "local".

[[companies]]
company_id = 1
company_name = "Hart & Cole LLP"
address = "100 Main Street, Austin, TX"
phone = "+1-512-555-0100"
url = "https://hartcole.example.com"

[[companies]]
company_id = 2
company_name = "LeadBridge Media"
address = "22 Market Street, Denver, CO"

[[advertisers]]
advertiser_id = 1
name = "John Hart"
email = "john@hartcole.example.com"
company_id = 1

[[advertisers]]
advertiser_id = 2
name = "Amy Cole"
email = "amy@hartcole.example.com"
company_id = 1

[[partners]]
partner_id = 1
name = "LeadBridge"
email = "billing@leadbridge.example.com"
company_id = 2

[[verticals]]
vertical_id = 1
vertical_name = "Personal Injury"

[[contracts]]
contract_id = 1
contract_name = "PI Texas Q1"
advertiser_id = 1
vertical_id = 1
budget_limit = "25000"

[[invoices]]
invoice_id = 1
advertiser_id = 1
partner_id = 1
issued_date = "2026-01-10"
due_date = "2026-02-09"
payment_term = "30"
invoice_status = "Draft"
tax = "0"

[[invoice_items]]
id = 1
invoice_id = 1
contract_id = 1
retainer = 4
unit_price = "250"

[[leads]]
lead_id = "L-1001"
created_date = "2026-01-05"
campaign = "PI Texas"
status = "Retained"
first_name = "Dana"
last_name = "Reyes"
email = "dana@example.com"
retained = true
retained_date = "2026-01-09"
revenue = "250"
returned = false
"#;
