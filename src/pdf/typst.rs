use std::path::Path;
use std::process::Command;

use crate::error::{AdminError, Result};
use crate::invoice::InvoiceDocument;

/// Embedded Typst template for invoice generation
/// Uses a placeholder that gets replaced with the actual JSON file path
const INVOICE_TEMPLATE: &str = r##"// Invoice Template
// Data is loaded from JSON file

#let data = json("DATA_JSON_PATH")

#set page(
  paper: "us-letter",
  margin: (top: 1in, bottom: 1in, left: 1in, right: 1in),
)

#set text(font: "Helvetica", size: 10pt)

#let party(title, p) = [
  #text(weight: "bold", size: 11pt)[#title]
  #v(0.3em)
  #text(weight: "bold")[#p.name] \
  #p.company \
  #p.address \
  #p.email \
  #p.phone
]

// Header with invoice number and dates
#grid(
  columns: (1fr, 1fr),
  align: (left, right),
  [
    #text(size: 24pt, weight: "bold")[INVOICE]
    #v(0.3em)
    #text(size: 10pt, fill: gray)[Status: #data.status]
  ],
  [
    #table(
      columns: (auto, auto),
      stroke: none,
      align: (right, left),
      inset: 2pt,
      [*Invoice \#:*], [#data.number],
      [*Issued:*], [#data.issued_date],
      [*Due Date:*], [#data.due_date],
      [*Terms:*], [#data.payment_term],
    )
  ]
)

#v(1em)
#line(length: 100%, stroke: 0.5pt + gray)
#v(1em)

// Bill To / Invoice To
#grid(
  columns: (1fr, 1fr),
  party("Bill To:", data.bill_to),
  party("Invoice To:", data.invoice_to),
)

#v(1.5em)

// Line items table
#table(
  columns: (auto, 1fr, auto, auto, auto),
  align: (left, left, right, right, right),
  stroke: (x, y) => if y == 0 { (bottom: 1pt + black) } else if y > 0 { (bottom: 0.5pt + gray) },
  inset: 8pt,
  fill: (x, y) => if y == 0 { luma(240) } else { none },

  // Header
  [*Vertical*], [*Contract*], [*Retainers*], [*Unit Price*], [*Total*],

  // Items
  ..data.lines.map(line => (
    line.vertical,
    line.contract,
    str(line.retainer),
    line.unit_price,
    line.total,
  )).flatten()
)

#v(1em)

// Totals
#align(right)[
  #table(
    columns: (auto, auto),
    stroke: none,
    align: (right, right),
    inset: 6pt,

    [Subtotal:], [#data.subtotal],
    [Tax (#data.tax_percent):], [#data.tax_amount],

    table.hline(stroke: 1pt),
    [*Total:*], [*#data.total*],
  )
]

#if data.note != none [
  #v(2em)
  #text(weight: "bold")[Note:] #data.note
]
"##;

/// Generate PDF using Typst CLI
pub fn generate_pdf(document: &InvoiceDocument, output_path: &Path) -> Result<()> {
    // Check if typst is available
    let typst_check = Command::new("typst").arg("--version").output();

    if typst_check.is_err() {
        return Err(AdminError::TypstNotFound);
    }

    // Create temp directory for template
    let temp_dir = std::env::temp_dir().join(format!("adops-{}", std::process::id()));
    std::fs::create_dir_all(&temp_dir)?;

    // Serialize invoice data to JSON
    let json_data = serde_json::to_string(document)
        .map_err(|e| AdminError::PdfGeneration(e.to_string()))?;

    let json_path = temp_dir.join("data.json");
    std::fs::write(&json_path, &json_data)?;

    // Template reads data.json relative to the temp directory
    let template_content = INVOICE_TEMPLATE.replace("DATA_JSON_PATH", "data.json");
    let template_path = temp_dir.join("invoice.typ");
    std::fs::write(&template_path, &template_content)?;

    tracing::debug!(output = %output_path.display(), "running typst compile");
    let output = Command::new("typst")
        .arg("compile")
        .arg("--root")
        .arg(&temp_dir)
        .arg(&template_path)
        .arg(output_path)
        .output()?;

    // Clean up temp files
    let _ = std::fs::remove_dir_all(&temp_dir);

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(AdminError::PdfGeneration(stderr.to_string()));
    }

    Ok(())
}
