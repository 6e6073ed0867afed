//! Labeled-field CSV projection of table rows.

use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::error::{AdminError, Result};

pub const EXPORT_FILE_NAME: &str = "export.csv";

/// One output column: header label and the row field it reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub label: &'static str,
    pub field: &'static str,
}

const fn column(label: &'static str, field: &'static str) -> Column {
    Column { label, field }
}

/// Fixed column mapping of the leads export.
pub const LEAD_COLUMNS: [Column; 13] = [
    column("Lead ID", "lead_id"),
    column("Created Date", "created_date"),
    column("Campaign", "campaign"),
    column("Status", "status"),
    column("First", "first_name"),
    column("Last", "last_name"),
    column("Email", "email"),
    column("Phone", "phone"),
    column("Retained", "retained"),
    column("Retained Date", "retained_date"),
    column("Revenue", "revenue"),
    column("Returned", "returned"),
    column("Return Date", "return_date"),
];

/// Project `rows` onto `columns`: a header line of labels, then one line per
/// row with fields in column order. Null or missing fields are empty.
pub fn to_csv<T: Serialize>(rows: &[T], columns: &[Column]) -> Result<String> {
    let mut out = String::new();
    push_record(&mut out, columns.iter().map(|c| c.label.to_string()));

    for row in rows {
        let value = serde_json::to_value(row).map_err(|e| AdminError::Payload(e.to_string()))?;
        push_record(
            &mut out,
            columns
                .iter()
                .map(|c| cell(value.get(c.field).unwrap_or(&Value::Null))),
        );
    }
    Ok(out)
}

/// Write the projection to `<dir>/export.csv`.
pub fn write_csv<T: Serialize>(rows: &[T], columns: &[Column], dir: &Path) -> Result<PathBuf> {
    let content = to_csv(rows, columns)?;
    std::fs::create_dir_all(dir)?;
    let path = dir.join(EXPORT_FILE_NAME);
    std::fs::write(&path, content)?;
    tracing::info!(rows = rows.len(), path = %path.display(), "exported csv");
    Ok(path)
}

fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

fn push_record(out: &mut String, fields: impl Iterator<Item = String>) {
    let line: Vec<String> = fields.map(|f| escape(&f)).collect();
    out.push_str(&line.join(","));
    out.push('\n');
}

fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
