use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};
use tracing_subscriber::EnvFilter;

use adops::backend::{Backend, InvoiceQuery, Page, SEARCH_LIMIT};
use adops::config::{
    config_dir, load_config, open_backend, resolve_output_dir, Config, CONFIG_TEMPLATE,
    STORE_TEMPLATE,
};
use adops::error::{AdminError, Result};
use adops::export::{write_csv, LEAD_COLUMNS};
use adops::format::{format_date, format_money, format_percent, format_whole_money, PLACEHOLDER};
use adops::invoice::{
    check, due_label, list_invoices, InvoiceEditor, InvoiceListRow, LineEdit, RenderSettings,
};
use adops::model::{InvoiceStatus, NewCompany, PaymentTerm};
use adops::onboarding::{onboard_advertiser, AdvertiserSignup, ContractTerms};
use adops::AuthContext;

/// Row cap for the party and contract listings when no search prefix is given.
const BROWSE_LIMIT: usize = 500;

#[derive(Parser)]
#[command(name = "adops")]
#[command(version, about = "Advertiser and partner invoicing console", long_about = None)]
struct Cli {
    /// Path to config directory (default: ~/.adops or XDG config)
    #[arg(short = 'C', long, global = true)]
    config_dir: Option<PathBuf>,

    /// Log backend requests and save steps to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize config directory with a config and a sample local store
    Init,

    /// Show the configured backend and operator
    Status,

    /// List invoices, newest first
    List {
        /// Only invoices with this status (draft, sent, received, paid, canceled)
        #[arg(short, long)]
        status: Option<String>,

        /// Only the invoice with this id
        #[arg(long)]
        id: Option<i64>,

        /// Issued on or after this date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Issued on or before this date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,

        /// Page number, starting at 1
        #[arg(short, long, default_value_t = 1)]
        page: usize,

        /// Rows per page (default: invoice.page_size from config)
        #[arg(long)]
        page_size: Option<usize>,
    },

    /// Show one invoice with its parties, line items and totals
    Show {
        invoice: i64,
    },

    /// Edit an invoice and save it
    Edit {
        invoice: i64,

        /// Tax percentage between 0 and 100
        #[arg(long)]
        tax: Option<Decimal>,

        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due_date: Option<NaiveDate>,

        /// Advertiser id to bill
        #[arg(long)]
        advertiser: Option<i64>,

        /// Partner id issuing the invoice
        #[arg(long)]
        partner: Option<i64>,

        /// Payment term: prepay, 30, 60 or 90
        #[arg(long)]
        payment_term: Option<String>,

        /// Free-text note; an empty string clears it
        #[arg(long)]
        note: Option<String>,

        /// Line item change in format "row:retainer:price[:contract]" (can be repeated)
        #[arg(short, long, value_name = "ROW:RETAINER:PRICE[:CONTRACT]")]
        line: Vec<String>,
    },

    /// Validate a draft invoice and mark it as sent
    Send {
        invoice: i64,
    },

    /// Render an invoice to PDF
    Download {
        invoice: i64,

        /// Output directory (default: pdf.output_dir from config)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Open generated PDF with system default viewer
        #[arg(long)]
        open: bool,
    },

    /// List advertisers
    Advertisers {
        /// Case-insensitive name prefix
        #[arg(short, long)]
        search: Option<String>,
    },

    /// List partners
    Partners {
        /// Case-insensitive name prefix
        #[arg(short, long)]
        search: Option<String>,
    },

    /// List contracts
    Contracts {
        /// Case-insensitive name prefix
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Export every lead to export.csv
    ExportLeads {
        /// Output directory (default: export.output_dir from config)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Create a company, an advertiser and optionally a first contract
    AddAdvertiser {
        /// Advertiser contact name
        #[arg(long)]
        name: String,

        #[arg(long)]
        email: Option<String>,

        #[arg(long)]
        phone: Option<String>,

        /// Company name
        #[arg(long)]
        company: String,

        #[arg(long)]
        address: Option<String>,

        #[arg(long)]
        company_phone: Option<String>,

        #[arg(long)]
        url: Option<String>,

        /// Name of the first contract
        #[arg(long, requires = "vertical")]
        contract: Option<String>,

        /// Vertical id of the first contract
        #[arg(long, requires = "contract")]
        vertical: Option<i64>,

        /// Budget limit of the first contract
        #[arg(long, requires = "contract")]
        budget: Option<Decimal>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "adops=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Config, backend and operator shared by every command except `init`.
struct Session {
    cfg_dir: PathBuf,
    config: Config,
    backend: Box<dyn Backend>,
    auth: AuthContext,
}

impl Session {
    fn open(cfg_dir: &Path) -> Result<Self> {
        let config = load_config(cfg_dir)?;
        let backend = open_backend(cfg_dir, &config)?;
        let auth = AuthContext::from_settings(&config.auth);
        tracing::debug!(user = %auth.user, role = %auth.role, "session opened");
        Ok(Self {
            cfg_dir: cfg_dir.to_path_buf(),
            config,
            backend,
            auth,
        })
    }

    fn render(&self) -> RenderSettings {
        RenderSettings::from_config(&self.config.invoice)
    }

    fn symbol(&self) -> &str {
        &self.config.invoice.currency_symbol
    }
}

fn run(cli: Cli) -> Result<()> {
    let cfg_dir = match cli.config_dir {
        Some(p) => p,
        None => config_dir()?,
    };

    if let Commands::Init = cli.command {
        return cmd_init(&cfg_dir);
    }
    let session = Session::open(&cfg_dir)?;

    match cli.command {
        Commands::Init => Ok(()),
        Commands::Status => cmd_status(&session),
        Commands::List {
            status,
            id,
            from,
            to,
            page,
            page_size,
        } => {
            let status = status.as_deref().map(parse_status).transpose()?;
            let query = InvoiceQuery {
                status,
                id_match: id,
                from,
                to,
                page: page.saturating_sub(1),
                page_size: page_size.unwrap_or(session.config.invoice.page_size),
            };
            cmd_list(&session, &query)
        }
        Commands::Show { invoice } => cmd_show(&session, invoice),
        Commands::Edit {
            invoice,
            tax,
            due_date,
            advertiser,
            partner,
            payment_term,
            note,
            line,
        } => {
            let changes = EditArgs {
                tax,
                due_date,
                advertiser,
                partner,
                payment_term: payment_term.as_deref().map(parse_payment_term).transpose()?,
                note,
                lines: line
                    .iter()
                    .map(|l| parse_line_edit(l.as_str()))
                    .collect::<Result<Vec<_>>>()?,
            };
            cmd_edit(&session, invoice, changes)
        }
        Commands::Send { invoice } => cmd_send(&session, invoice),
        Commands::Download {
            invoice,
            output,
            open,
        } => cmd_download(&session, invoice, output, open),
        Commands::Advertisers { search } => cmd_parties(&session, PartyKind::Advertiser, search),
        Commands::Partners { search } => cmd_parties(&session, PartyKind::Partner, search),
        Commands::Contracts { search } => cmd_contracts(&session, search),
        Commands::ExportLeads { output } => cmd_export_leads(&session, output),
        Commands::AddAdvertiser {
            name,
            email,
            phone,
            company,
            address,
            company_phone,
            url,
            contract,
            vertical,
            budget,
        } => {
            let contract = match (contract, vertical) {
                (Some(contract_name), Some(vertical_id)) => Some(ContractTerms {
                    contract_name,
                    vertical_id,
                    budget_limit: budget,
                }),
                _ => None,
            };
            let signup = AdvertiserSignup {
                name,
                email,
                phone,
                company: NewCompany {
                    company_name: company,
                    address,
                    phone: company_phone,
                    url,
                },
                contract,
            };
            cmd_add_advertiser(&session, &signup)
        }
    }
}

/// Initialize config directory with template files
fn cmd_init(cfg_dir: &Path) -> Result<()> {
    use std::fs;

    if cfg_dir.exists() {
        return Err(AdminError::AlreadyInitialized(cfg_dir.to_path_buf()));
    }

    fs::create_dir_all(cfg_dir.join("output"))?;
    fs::write(cfg_dir.join("config.toml"), CONFIG_TEMPLATE)?;
    fs::write(cfg_dir.join("store.toml"), STORE_TEMPLATE)?;

    println!("Initialized adops config at: {}", cfg_dir.display());
    println!();
    println!("Next steps:");
    println!(
        "  1. Choose a backend and operator:  $EDITOR {}/config.toml",
        cfg_dir.display()
    );
    println!(
        "  2. Or edit the sample data:        $EDITOR {}/store.toml",
        cfg_dir.display()
    );
    println!();
    println!("Then list invoices:");
    println!("  adops list");

    Ok(())
}

fn cmd_status(session: &Session) -> Result<()> {
    let config = &session.config;
    println!("Config:    {}", session.cfg_dir.join("config.toml").display());
    match &config.backend {
        adops::BackendSettings::Local { store } => {
            println!(
                "Backend:   local ({})",
                resolve_output_dir(store, &session.cfg_dir).display()
            );
        }
        adops::BackendSettings::Rest { url, api_key_env } => {
            println!("Backend:   rest ({url}, key from ${api_key_env})");
        }
    }
    println!("Operator:  {} ({})", session.auth.user, session.auth.role);
    println!(
        "Tax mode:  {}",
        match config.invoice.tax_mode {
            adops::TaxMode::Deduct => "deduct",
            adops::TaxMode::Add => "add",
        }
    );
    println!("Page size: {}", config.invoice.page_size);

    let drafts = session.backend.list_invoices(&InvoiceQuery {
        status: Some(InvoiceStatus::Draft),
        page_size: 1,
        ..Default::default()
    })?;
    println!("Drafts:    {}", drafts.total_count);
    Ok(())
}

#[derive(Tabled)]
struct InvoiceRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "ISSUED")]
    issued: String,
    #[tabled(rename = "ADVERTISER")]
    advertiser: String,
    #[tabled(rename = "STATUS")]
    status: String,
    #[tabled(rename = "DUE")]
    due: String,
    #[tabled(rename = "TOTAL")]
    total: String,
    #[tabled(rename = "ACTIONS")]
    actions: String,
}

fn cmd_list(session: &Session, query: &InvoiceQuery) -> Result<()> {
    let page = list_invoices(
        session.backend.as_ref(),
        query,
        session.config.invoice.tax_mode,
    )?;

    if page.total_count == 0 {
        println!("No invoices found.");
        return Ok(());
    }
    if page.rows.is_empty() {
        println!(
            "Page {} is empty; there are {} page(s).",
            page.page.saturating_add(1),
            page.page_count()
        );
        return Ok(());
    }

    let today = Local::now().date_naive();
    let rows: Vec<InvoiceRow> = page
        .rows
        .iter()
        .map(|row| invoice_row(row, today, session.symbol()))
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    println!("{}", page_footer(&page));
    Ok(())
}

fn invoice_row(row: &InvoiceListRow, today: NaiveDate, symbol: &str) -> InvoiceRow {
    let record = &row.record;
    InvoiceRow {
        id: record.invoice_id,
        issued: record
            .issued_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string()),
        advertiser: row
            .advertiser
            .clone()
            .unwrap_or_else(|| PLACEHOLDER.to_string()),
        status: record.invoice_status.to_string(),
        due: due_label(record.due_date, record.invoice_status, today),
        total: format_whole_money(row.totals.total, symbol),
        actions: row
            .actions
            .iter()
            .map(|a| a.to_string())
            .collect::<Vec<_>>()
            .join(", "),
    }
}

fn page_footer<T>(page: &Page<T>) -> String {
    let mut footer = format!(
        "Showing {}-{} of {} (page {}/{})",
        page.first_row(),
        page.last_row(),
        page.total_count,
        page.page.saturating_add(1),
        page.page_count()
    );
    if page.has_previous() {
        footer.push_str(&format!("  prev: --page {}", page.page));
    }
    if page.has_next() {
        footer.push_str(&format!("  next: --page {}", page.page.saturating_add(2)));
    }
    footer
}

#[derive(Tabled)]
struct LineRow {
    #[tabled(rename = "ROW")]
    row: i64,
    #[tabled(rename = "VERTICAL")]
    vertical: String,
    #[tabled(rename = "CONTRACT")]
    contract: String,
    #[tabled(rename = "RETAINERS")]
    retainer: u32,
    #[tabled(rename = "UNIT PRICE")]
    unit_price: String,
    #[tabled(rename = "TOTAL")]
    total: String,
}

fn cmd_show(session: &Session, invoice_id: i64) -> Result<()> {
    let mut editor = InvoiceEditor::new(session.backend.as_ref(), session.render());
    let invoice = editor.open(invoice_id)?.clone();
    let totals = editor.totals().unwrap_or_else(|| invoice.totals(session.render().tax_mode));
    editor.close();

    let header = &invoice.header;
    let symbol = session.symbol();
    let party_name = |party: Option<&adops::model::BillingParty>| {
        party
            .map(|p| match p.company.as_ref() {
                Some(company) => format!("{} ({})", p.name, company.company_name),
                None => p.name.clone(),
            })
            .unwrap_or_else(|| PLACEHOLDER.to_string())
    };

    println!("Invoice #{}", header.invoice_id);
    println!("  Status:       {}", header.invoice_status);
    println!("  Issued:       {}", format_date(header.issued_date));
    println!("  Due:          {}", format_date(header.due_date));
    println!(
        "  Payment term: {}",
        header
            .payment_term
            .map(|t| t.to_string())
            .unwrap_or_else(|| PLACEHOLDER.to_string())
    );
    println!("  Bill to:      {}", party_name(invoice.advertiser.as_ref()));
    println!("  Invoice to:   {}", party_name(invoice.partner.as_ref()));
    if let Some(note) = &header.note {
        println!("  Note:         {note}");
    }
    println!();

    if invoice.lines.is_empty() {
        println!("No line items.");
    } else {
        let rows: Vec<LineRow> = invoice
            .lines
            .iter()
            .map(|line| {
                let contract = line.contract.as_ref();
                LineRow {
                    row: line.item.id,
                    vertical: contract
                        .and_then(|c| c.vertical.as_ref())
                        .map(|v| v.vertical_name.clone())
                        .unwrap_or_else(|| PLACEHOLDER.to_string()),
                    contract: contract
                        .map(|c| c.contract_name.clone())
                        .unwrap_or_else(|| PLACEHOLDER.to_string()),
                    retainer: line.item.retainer,
                    unit_price: format_money(line.item.unit_price, symbol),
                    total: format_money(line.item.line_total(), symbol),
                }
            })
            .collect();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
    }

    println!();
    println!("  Subtotal: {}", format_money(totals.subtotal, symbol));
    println!(
        "  Tax ({}): {}",
        format_percent(totals.tax_percent),
        format_money(totals.tax_amount, symbol)
    );
    println!("  Total:    {}", format_money(totals.total, symbol));

    let issues = check(&invoice);
    if !issues.is_empty() {
        println!();
        println!("Not ready to send:");
        for issue in issues {
            println!("  - {issue}");
        }
    }
    Ok(())
}

struct EditArgs {
    tax: Option<Decimal>,
    due_date: Option<NaiveDate>,
    advertiser: Option<i64>,
    partner: Option<i64>,
    payment_term: Option<PaymentTerm>,
    note: Option<String>,
    lines: Vec<(i64, LineEdit)>,
}

fn cmd_edit(session: &Session, invoice_id: i64, changes: EditArgs) -> Result<()> {
    session.auth.require_write("edit invoices")?;

    let mut editor = InvoiceEditor::new(session.backend.as_ref(), session.render());
    editor.open(invoice_id)?;

    if let Some(tax) = changes.tax {
        editor.set_tax(tax)?;
    }
    if let Some(id) = changes.advertiser {
        editor.set_advertiser(id)?;
    }
    if let Some(id) = changes.partner {
        editor.set_partner(id)?;
    }
    if let Some(due) = changes.due_date {
        editor.set_due_date(due)?;
    }
    if let Some(term) = changes.payment_term {
        editor.set_payment_term(term)?;
    }
    if let Some(note) = changes.note {
        editor.set_note(Some(note))?;
    }
    for (row, edit) in changes.lines {
        editor.update_line(row, edit)?;
    }

    let saved = editor.save()?;
    let total = saved.header.total_amount.unwrap_or_default();
    println!(
        "Saved invoice #{} ({}), total {}",
        saved.id(),
        saved.header.invoice_status,
        format_money(total, session.symbol())
    );
    Ok(())
}

fn cmd_send(session: &Session, invoice_id: i64) -> Result<()> {
    session.auth.require_write("send invoices")?;

    let mut editor = InvoiceEditor::new(session.backend.as_ref(), session.render());
    editor.open(invoice_id)?;
    let sent = editor.send()?;

    tracing::info!(invoice_id, user = %session.auth.user, "invoice sent");
    println!(
        "Invoice #{} marked as {}, total {}",
        sent.id(),
        sent.header.invoice_status,
        format_money(sent.header.total_amount.unwrap_or_default(), session.symbol())
    );
    Ok(())
}

fn cmd_download(
    session: &Session,
    invoice_id: i64,
    output: Option<PathBuf>,
    open: bool,
) -> Result<()> {
    let output_dir = output.unwrap_or_else(|| {
        resolve_output_dir(&session.config.pdf.output_dir, &session.cfg_dir)
    });

    let mut editor = InvoiceEditor::new(session.backend.as_ref(), session.render());
    editor.open(invoice_id)?;
    let path = editor.download(&output_dir)?;
    editor.close();

    println!("Rendered invoice #{invoice_id}: {}", path.display());
    if open {
        open_path(&path)?;
    }
    Ok(())
}

#[derive(Clone, Copy)]
enum PartyKind {
    Advertiser,
    Partner,
}

#[derive(Tabled)]
struct PartyRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "EMAIL")]
    email: String,
    #[tabled(rename = "COMPANY")]
    company: String,
}

fn cmd_parties(session: &Session, kind: PartyKind, search: Option<String>) -> Result<()> {
    let prefix = search.unwrap_or_default();
    let limit = if prefix.is_empty() {
        BROWSE_LIMIT
    } else {
        SEARCH_LIMIT
    };
    let (parties, label) = match kind {
        PartyKind::Advertiser => (
            session.backend.search_advertisers(&prefix, limit)?,
            "advertisers",
        ),
        PartyKind::Partner => (session.backend.search_partners(&prefix, limit)?, "partners"),
    };

    if parties.is_empty() {
        println!("No {label} found.");
        return Ok(());
    }

    let rows: Vec<PartyRow> = parties
        .into_iter()
        .map(|p| PartyRow {
            id: p.id,
            name: p.name,
            email: p.email.unwrap_or_else(|| "-".to_string()),
            company: p
                .company
                .map(|c| c.company_name)
                .unwrap_or_else(|| "-".to_string()),
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    Ok(())
}

#[derive(Tabled)]
struct ContractRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "VERTICAL")]
    vertical: String,
}

fn cmd_contracts(session: &Session, search: Option<String>) -> Result<()> {
    let prefix = search.unwrap_or_default();
    let limit = if prefix.is_empty() {
        BROWSE_LIMIT
    } else {
        SEARCH_LIMIT
    };
    let contracts = session.backend.search_contracts(&prefix, limit)?;

    if contracts.is_empty() {
        println!("No contracts found.");
        return Ok(());
    }

    let rows: Vec<ContractRow> = contracts
        .into_iter()
        .map(|c| ContractRow {
            id: c.contract_id,
            name: c.contract_name,
            vertical: c
                .vertical
                .map(|v| v.vertical_name)
                .unwrap_or_else(|| "-".to_string()),
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    Ok(())
}

fn cmd_export_leads(session: &Session, output: Option<PathBuf>) -> Result<()> {
    let output_dir = output.unwrap_or_else(|| {
        resolve_output_dir(&session.config.export.output_dir, &session.cfg_dir)
    });
    let leads = session.backend.leads()?;
    let path = write_csv(&leads, &LEAD_COLUMNS, &output_dir)?;
    println!("Exported {} lead(s) to {}", leads.len(), path.display());
    Ok(())
}

fn cmd_add_advertiser(session: &Session, signup: &AdvertiserSignup) -> Result<()> {
    session.auth.require_write("add advertisers")?;

    let onboarded = onboard_advertiser(session.backend.as_ref(), signup)?;
    println!(
        "Added advertiser #{} {} at {} (company #{})",
        onboarded.advertiser.advertiser_id,
        onboarded.advertiser.name,
        onboarded.company.company_name,
        onboarded.company.company_id
    );
    if let Some(contract) = onboarded.contract {
        println!(
            "  Contract #{} {}",
            contract.contract_id, contract.contract_name
        );
    }
    Ok(())
}

fn parse_status(value: &str) -> Result<InvoiceStatus> {
    InvoiceStatus::parse(value).ok_or_else(|| AdminError::InvalidArgument {
        field: "status",
        value: value.to_string(),
        reason: "expected draft, sent, received, paid or canceled".to_string(),
    })
}

fn parse_payment_term(value: &str) -> Result<PaymentTerm> {
    PaymentTerm::parse(value).ok_or_else(|| AdminError::InvalidArgument {
        field: "payment term",
        value: value.to_string(),
        reason: "expected prepay, 30, 60 or 90".to_string(),
    })
}

/// Parse "row:retainer:price[:contract]".
fn parse_line_edit(spec: &str) -> Result<(i64, LineEdit)> {
    let invalid = || AdminError::InvalidLineFormat(spec.to_string());
    let parts: Vec<&str> = spec.split(':').map(str::trim).collect();
    if !(3..=4).contains(&parts.len()) {
        return Err(invalid());
    }

    let row: i64 = parts[0].parse().map_err(|_| invalid())?;
    let retainer: u32 = parts[1].parse().map_err(|_| invalid())?;
    let unit_price: Decimal = parts[2].parse().map_err(|_| invalid())?;
    let contract_id = match parts.get(3) {
        Some(c) => Some(c.parse::<i64>().map_err(|_| invalid())?),
        None => None,
    };

    Ok((
        row,
        LineEdit {
            retainer: Some(retainer),
            unit_price: Some(unit_price),
            contract_id,
        },
    ))
}

fn open_path(path: &Path) -> Result<()> {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg(path).spawn()?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open").arg(path).spawn()?;
    }

    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/C", "start", ""])
            .arg(path)
            .spawn()?;
    }
    Ok(())
}
