use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

fn adops_cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("adops"))
}

const PARTIES: &str = r#"
[[companies]]
company_id = 1
company_name = "Hart & Cole LLP"

[[companies]]
company_id = 2
company_name = "LeadBridge Media"

[[advertisers]]
advertiser_id = 1
name = "John Hart"
company_id = 1

[[advertisers]]
advertiser_id = 2
name = "Amy Cole"
company_id = 1

[[advertisers]]
advertiser_id = 3
name = "Joanna Pike"

[[partners]]
partner_id = 1
name = "LeadBridge"
company_id = 2

[[verticals]]
vertical_id = 1
vertical_name = "Personal Injury"

[[contracts]]
contract_id = 1
contract_name = "PI Texas Q1"
advertiser_id = 1
vertical_id = 1
"#;

const INVOICES: &str = r#"
[[invoices]]
invoice_id = 42
advertiser_id = 1
partner_id = 1
issued_date = "2026-01-10"
due_date = "2026-02-09"
payment_term = "30"
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
advertiser_id = 2
partner_id = 1
issued_date = "2025-11-02"
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
invoice_id = 43
contract_id = 1
retainer = 2
unit_price = "100"

[[invoice_items]]
id = 9
invoice_id = 44
contract_id = 1
retainer = 1
unit_price = "300"

[[leads]]
lead_id = "A1"
created_date = "2026-01-05"
campaign = "LDS"
first_name = "Dana"
retained = true
returned = false
"#;

fn write_config(dir: &Path, role: &str) {
    fs::create_dir_all(dir).unwrap();
    let config = format!(
        r#"[backend]
kind = "local"
store = "store.toml"

[invoice]
currency_symbol = "$"
tax_mode = "deduct"
page_size = 10

[pdf]
output_dir = "output"

[auth]
user = "ops@example.com"
role = "{role}"
"#
    );
    fs::write(dir.join("config.toml"), config).unwrap();
}

fn setup(role: &str) -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    write_config(temp_dir.path(), role);
    fs::write(
        temp_dir.path().join("store.toml"),
        format!("{PARTIES}{INVOICES}"),
    )
    .unwrap();
    temp_dir
}

fn with_dir(dir: &Path) -> Command {
    let mut cmd = adops_cmd();
    cmd.args(["-C", dir.to_str().unwrap()]);
    cmd
}

#[test]
fn test_help() {
    adops_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Advertiser and partner invoicing console",
        ));
}

#[test]
fn test_version() {
    adops_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("adops"));
}

#[test]
fn test_init_creates_config() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("adops-config");

    with_dir(&config_path)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized adops config"));

    assert!(config_path.join("config.toml").exists());
    assert!(config_path.join("store.toml").exists());
    assert!(config_path.join("output").is_dir());

    with_dir(&config_path)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("John Hart"));
}

#[test]
fn test_init_fails_if_exists() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("adops-config");

    with_dir(&config_path).arg("init").assert().success();

    with_dir(&config_path)
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_status_without_init() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("nonexistent");

    with_dir(&config_path)
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_status_reports_operator_and_drafts() {
    let temp_dir = setup("manager");

    with_dir(temp_dir.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("ops@example.com (manager)"))
        .stdout(predicate::str::contains("Drafts:    2"));
}

#[test]
fn test_list_shows_totals_and_actions() {
    let temp_dir = setup("admin");

    with_dir(temp_dir.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("John Hart"))
        .stdout(predicate::str::contains("$   395"))
        .stdout(predicate::str::contains("download, edit, send"))
        .stdout(predicate::str::contains("Showing 1-3 of 3"));
}

#[test]
fn test_list_filters_by_status() {
    let temp_dir = setup("admin");

    with_dir(temp_dir.path())
        .args(["list", "--status", "paid"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Amy Cole"))
        .stdout(predicate::str::contains("John Hart").not());
}

#[test]
fn test_list_rejects_unknown_status() {
    let temp_dir = setup("admin");

    with_dir(temp_dir.path())
        .args(["list", "--status", "overdue"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid status value 'overdue'"));
}

#[test]
fn test_list_last_page() {
    let temp_dir = TempDir::new().unwrap();
    write_config(temp_dir.path(), "admin");

    let mut store = String::from(PARTIES);
    for id in 1..=47 {
        store.push_str(&format!(
            "\n[[invoices]]\ninvoice_id = {id}\nadvertiser_id = 1\nissued_date = \"2026-01-10\"\ninvoice_status = \"Draft\"\ntax = \"0\"\n"
        ));
    }
    fs::write(temp_dir.path().join("store.toml"), store).unwrap();

    with_dir(temp_dir.path())
        .args(["list", "--page", "5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Showing 41-47 of 47 (page 5/5)"))
        .stdout(predicate::str::contains("prev: --page 4"))
        .stdout(predicate::str::contains("next:").not());

    with_dir(temp_dir.path())
        .args(["list", "--page", "4"])
        .assert()
        .success()
        .stdout(predicate::str::contains("next: --page 5"));
}

#[test]
fn test_list_huge_page_is_empty() {
    let temp_dir = setup("viewer");

    with_dir(temp_dir.path())
        .args(["list", "--page", "18446744073709551615"])
        .assert()
        .success()
        .stdout(predicate::str::contains("is empty; there are 1 page(s)"));
}

#[test]
fn test_show_computes_totals() {
    let temp_dir = setup("viewer");

    with_dir(temp_dir.path())
        .args(["show", "42"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Subtotal: $500.00"))
        .stdout(predicate::str::contains("Tax (21%): $105.00"))
        .stdout(predicate::str::contains("Total:    $395.00"))
        .stdout(predicate::str::contains("Personal Injury"));
}

#[test]
fn test_show_lists_missing_fields() {
    let temp_dir = setup("viewer");

    with_dir(temp_dir.path())
        .args(["show", "43"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Not ready to send"))
        .stdout(predicate::str::contains("partner is not set"));
}

#[test]
fn test_show_unknown_invoice() {
    let temp_dir = setup("viewer");

    with_dir(temp_dir.path())
        .args(["show", "999"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invoice 999 not found"));
}

#[test]
fn test_advertiser_search_is_prefix_and_case_insensitive() {
    let temp_dir = setup("viewer");

    with_dir(temp_dir.path())
        .args(["advertisers", "--search", "jo"])
        .assert()
        .success()
        .stdout(predicate::str::contains("John Hart"))
        .stdout(predicate::str::contains("Joanna Pike"))
        .stdout(predicate::str::contains("Amy Cole").not());
}

#[test]
fn test_contracts_show_vertical() {
    let temp_dir = setup("viewer");

    with_dir(temp_dir.path())
        .arg("contracts")
        .assert()
        .success()
        .stdout(predicate::str::contains("PI Texas Q1"))
        .stdout(predicate::str::contains("Personal Injury"));
}

#[test]
fn test_send_incomplete_invoice_writes_nothing() {
    let temp_dir = setup("admin");
    let store_path = temp_dir.path().join("store.toml");
    let before = fs::read_to_string(&store_path).unwrap();

    with_dir(temp_dir.path())
        .args(["send", "43"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("partner is not set"))
        .stderr(predicate::str::contains("due date is not set"));

    assert_eq!(fs::read_to_string(&store_path).unwrap(), before);
}

#[test]
fn test_send_marks_invoice_sent() {
    let temp_dir = setup("admin");

    with_dir(temp_dir.path())
        .args(["send", "42"])
        .assert()
        .success()
        .stdout(predicate::str::contains("marked as Sent"))
        .stdout(predicate::str::contains("$395.00"));

    with_dir(temp_dir.path())
        .args(["list", "--status", "sent"])
        .assert()
        .success()
        .stdout(predicate::str::contains("42"))
        .stdout(predicate::str::contains("download, edit"));

    with_dir(temp_dir.path())
        .args(["send", "42"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("can only be sent from Draft"));
}

#[test]
fn test_edit_updates_line_and_tax() {
    let temp_dir = setup("admin");

    with_dir(temp_dir.path())
        .args(["edit", "42", "--tax", "10", "--line", "7:4:250"])
        .assert()
        .success()
        .stdout(predicate::str::contains("total $900.00"));

    let store = fs::read_to_string(temp_dir.path().join("store.toml")).unwrap();
    assert!(store.contains("retainer = 4"));
}

#[test]
fn test_edit_paid_invoice_is_rejected() {
    let temp_dir = setup("admin");

    with_dir(temp_dir.path())
        .args(["edit", "44", "--tax", "5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("can no longer be edited"));
}

#[test]
fn test_edit_rejects_out_of_range_tax() {
    let temp_dir = setup("admin");

    with_dir(temp_dir.path())
        .args(["edit", "42", "--tax", "120"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("must be between 0 and 100"));
}

#[test]
fn test_edit_invalid_line_format() {
    let temp_dir = setup("admin");

    with_dir(temp_dir.path())
        .args(["edit", "42", "--line", "7:ten:50"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid line edit '7:ten:50'"));
}

#[test]
fn test_viewer_cannot_send() {
    let temp_dir = setup("viewer");

    with_dir(temp_dir.path())
        .args(["send", "42"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "Role 'viewer' is not allowed to send invoices",
        ));
}

#[test]
fn test_export_leads_writes_csv() {
    let temp_dir = setup("viewer");
    let out = temp_dir.path().join("exports");

    with_dir(temp_dir.path())
        .args(["export-leads", "--output", out.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported 1 lead(s)"));

    let csv = fs::read_to_string(out.join("export.csv")).unwrap();
    let mut lines = csv.lines();
    assert_eq!(
        lines.next(),
        Some("Lead ID,Created Date,Campaign,Status,First,Last,Email,Phone,Retained,Retained Date,Revenue,Returned,Return Date")
    );
    assert_eq!(lines.next(), Some("A1,2026-01-05,LDS,,Dana,,,,true,,,false,"));
}

#[test]
fn test_add_advertiser_with_contract() {
    let temp_dir = setup("admin");

    with_dir(temp_dir.path())
        .args([
            "add-advertiser",
            "--name",
            "Zed Lowe",
            "--company",
            "Lowe Legal",
            "--contract",
            "PI Ohio",
            "--vertical",
            "1",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added advertiser #4 Zed Lowe"))
        .stdout(predicate::str::contains("Contract #2 PI Ohio"));
}

#[test]
fn test_add_advertiser_rolls_back_on_missing_vertical() {
    let temp_dir = setup("admin");
    let store_path = temp_dir.path().join("store.toml");

    with_dir(temp_dir.path())
        .args([
            "add-advertiser",
            "--name",
            "Zed Lowe",
            "--company",
            "Lowe Legal",
            "--contract",
            "PI Ohio",
            "--vertical",
            "9",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("earlier steps rolled back"));

    let store = fs::read_to_string(&store_path).unwrap();
    assert!(!store.contains("Zed Lowe"));
    assert!(!store.contains("Lowe Legal"));
}
