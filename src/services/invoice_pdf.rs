//! Single-page PDF rendering for invoices using the standard Helvetica fonts.

use chrono::NaiveDate;
use lopdf::{
    content::{Content, Operation},
    dictionary, Document, Object, Stream,
};
use rust_decimal::Decimal;

use crate::errors::ServiceError;

#[derive(Debug, Clone)]
pub struct InvoiceDocument {
    pub invoice_number: String,
    pub invoice_date: NaiveDate,
    pub due_date: NaiveDate,
    pub status: String,
    pub vendor_name: String,
    pub vendor_address: Vec<String>,
    pub po_number: Option<String>,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub total_amount: Decimal,
    pub paid_amount: Decimal,
    pub balance_due: Decimal,
    pub notes: String,
}

impl InvoiceDocument {
    pub fn filename(&self) -> String {
        format!("invoice_{}.pdf", file_safe(&self.invoice_number))
    }
}

/// Keeps ASCII letters, digits, `-` and `.`; everything else becomes `_` so
/// the result is safe in paths and quoted header values.
pub(crate) fn file_safe(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[derive(Clone, Copy)]
enum Font {
    Regular,
    Bold,
}

impl Font {
    fn resource(self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
        }
    }
}

/// Accumulates content stream operations for one page.
struct Page {
    operations: Vec<Operation>,
}

impl Page {
    fn new() -> Self {
        Self {
            operations: Vec::new(),
        }
    }

    fn text(&mut self, x: i64, y: i64, size: i64, font: Font, text: &str) {
        self.operations.extend([
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![font.resource().into(), Object::Integer(size)],
            ),
            Operation::new("Td", vec![Object::Integer(x), Object::Integer(y)]),
            Operation::new("Tj", vec![Object::string_literal(winansi(text))]),
            Operation::new("ET", vec![]),
        ]);
    }

    fn rule(&mut self, x1: i64, x2: i64, y: i64) {
        self.operations.extend([
            Operation::new("w", vec![0.5.into()]),
            Operation::new("m", vec![Object::Integer(x1), Object::Integer(y)]),
            Operation::new("l", vec![Object::Integer(x2), Object::Integer(y)]),
            Operation::new("S", vec![]),
        ]);
    }
}

/// Replaces characters the standard fonts cannot show.
fn winansi(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\u{20b9}' => out.push_str("Rs."),
            c if c.is_ascii() && !c.is_ascii_control() => out.push(c),
            _ => out.push('?'),
        }
    }
    out
}

fn money(amount: Decimal) -> String {
    format!("Rs. {:.2}", amount.round_dp(2))
}

fn pdf_error(err: lopdf::Error) -> ServiceError {
    ServiceError::InternalError(format!("invoice PDF rendering failed: {err}"))
}

pub fn render(doc: &InvoiceDocument) -> Result<Vec<u8>, ServiceError> {
    let mut page = Page::new();
    page.text(50, 780, 24, Font::Bold, "INVOICE");
    page.text(50, 750, 11, Font::Regular, &format!("Invoice Number: {}", doc.invoice_number));
    page.text(50, 735, 11, Font::Regular, &format!("Invoice Date: {}", doc.invoice_date));
    page.text(50, 720, 11, Font::Regular, &format!("Due Date: {}", doc.due_date));
    page.text(50, 705, 11, Font::Regular, &format!("Status: {}", doc.status));
    if let Some(po) = &doc.po_number {
        page.text(50, 690, 11, Font::Regular, &format!("PO Number: {}", po));
    }

    page.text(50, 655, 13, Font::Bold, "Vendor");
    page.text(50, 638, 11, Font::Regular, &doc.vendor_name);
    let mut y = 623;
    for line in doc.vendor_address.iter().filter(|l| !l.trim().is_empty()) {
        page.text(50, y, 10, Font::Regular, line);
        y -= 14;
    }

    y -= 20;
    page.rule(50, 545, y + 12);
    let rows = [
        ("Subtotal", doc.subtotal),
        ("Tax", doc.tax_amount),
        ("Total", doc.total_amount),
        ("Paid", doc.paid_amount),
        ("Balance Due", doc.balance_due),
    ];
    for (label, value) in rows {
        let font = if label == "Total" { Font::Bold } else { Font::Regular };
        page.text(320, y, 11, font, label);
        page.text(440, y, 11, Font::Regular, &money(value));
        y -= 16;
    }
    page.rule(50, 545, y + 8);

    if !doc.notes.trim().is_empty() {
        page.text(50, y - 20, 10, Font::Regular, &format!("Notes: {}", doc.notes));
    }

    assemble(page.operations)
}

fn assemble(operations: Vec<Operation>) -> Result<Vec<u8>, ServiceError> {
    let mut pdf = Document::with_version("1.4");
    let pages_id = pdf.new_object_id();

    let regular = pdf.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let bold = pdf.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = pdf.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => regular,
            "F2" => bold,
        },
    });

    let content = Content { operations };
    let content_id = pdf.add_object(Stream::new(
        dictionary! {},
        content.encode().map_err(pdf_error)?,
    ));
    let page_id = pdf.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });

    pdf.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = pdf.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    pdf.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    pdf.save_to(&mut bytes)
        .map_err(|e| ServiceError::InternalError(format!("invoice PDF write failed: {e}")))?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> InvoiceDocument {
        InvoiceDocument {
            invoice_number: "INV-(7)".into(),
            invoice_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            due_date: NaiveDate::from_ymd_opt(2025, 3, 31).unwrap(),
            status: "pending".into(),
            vendor_name: "Acme Supplies".into(),
            vendor_address: vec!["1 Main St".into(), "".into(), "Pune 411001".into()],
            po_number: Some("PO-20250301-0001".into()),
            subtotal: Decimal::new(1000, 0),
            tax_amount: Decimal::new(180, 0),
            total_amount: Decimal::new(1230, 0),
            paid_amount: Decimal::ZERO,
            balance_due: Decimal::new(1230, 0),
            notes: String::new(),
        }
    }

    fn shown_text(bytes: &[u8]) -> Vec<String> {
        let pdf = Document::load_mem(bytes).unwrap();
        let pages = pdf.get_pages();
        assert_eq!(pages.len(), 1);
        let page_id = *pages.get(&1).unwrap();
        let content = Content::decode(&pdf.get_page_content(page_id).unwrap()).unwrap();
        content
            .operations
            .iter()
            .filter(|op| op.operator == "Tj")
            .filter_map(|op| match op.operands.first() {
                Some(Object::String(bytes, _)) => Some(String::from_utf8_lossy(bytes).into_owned()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn renders_a_readable_document() {
        let bytes = render(&doc()).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.4"));

        let text = shown_text(&bytes);
        assert_eq!(text[0], "INVOICE");
        assert!(text.contains(&"Invoice Number: INV-(7)".to_string()));
        assert!(text.contains(&"PO Number: PO-20250301-0001".to_string()));
        assert!(text.contains(&"Rs. 1230.00".to_string()));
        assert!(!text.iter().any(|t| t.is_empty()));
    }

    #[test]
    fn filename_uses_invoice_number() {
        assert_eq!(doc().filename(), "invoice_INV-_7_.pdf");
    }

    #[test]
    fn filename_drops_quotes_and_control_characters() {
        let mut doc = doc();
        doc.invoice_number = "A\"B\r\n/C\u{20b9}".into();
        assert_eq!(doc.filename(), "invoice_A_B___C_.pdf");
    }

    #[test]
    fn non_latin_text_falls_back_to_ascii() {
        assert_eq!(winansi("\u{20b9}5 (net) \u{00e9}"), "Rs.5 (net) ?");
    }
}
