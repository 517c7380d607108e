//! Quote document export
//!
//! Renders one option of a revision as a customer-facing quote. HTML and
//! Markdown go through the embedded Tera templates; CSV is written with
//! the `csv` crate so spreadsheets can take the line items directly.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use rust_embed::Embed;
use serde::Serialize;
use tera::Tera;
use thiserror::Error;

use crate::core::identity::EntityId;
use crate::entities::deal::Deal;
use crate::pricing::totals::money;

#[derive(Embed)]
#[folder = "templates/"]
struct EmbeddedTemplates;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ExportFormat {
    Html,
    Md,
    Csv,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Html => "html",
            ExportFormat::Md => "md",
            ExportFormat::Csv => "csv",
        }
    }

    fn template(&self) -> Option<&'static str> {
        match self {
            ExportFormat::Html => Some("quote.html.tera"),
            ExportFormat::Md => Some("quote.md.tera"),
            ExportFormat::Csv => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("option {0} not found in deal")]
    OptionNotFound(String),

    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    #[error("Template rendering error: {0}")]
    Render(String),

    #[error("CSV error: {0}")]
    Csv(String),
}

/// One line of the exported quote, already formatted
#[derive(Debug, Clone, Serialize)]
pub struct DocumentRow {
    pub line: usize,
    pub sku: String,
    pub name: String,
    pub notes: Option<String>,
    pub quantity: u32,
    pub unit_price: String,
    pub discount: String,
    pub line_total: String,
}

/// Everything a quote document shows
#[derive(Debug, Clone, Serialize)]
pub struct QuoteDocument {
    pub project_name: String,
    pub recipient: String,
    pub revision: u32,
    pub option_name: String,
    pub prepared_by: String,
    pub date: String,
    pub currency: String,
    pub gst_percent: String,
    pub rows: Vec<DocumentRow>,
    pub subtotal: String,
    pub freight: String,
    pub grand_total: String,
    pub gst: String,
    pub total_inc_gst: String,
}

/// Presentation settings for a quote document
#[derive(Debug, Clone)]
pub struct DocumentSettings {
    pub prepared_by: String,
    pub currency: String,
    pub gst_rate: Decimal,
    pub date: NaiveDate,
}

impl QuoteDocument {
    pub fn build(deal: &Deal, option_id: &EntityId, settings: &DocumentSettings) -> Result<Self, ExportError> {
        let option = deal
            .option(option_id)
            .ok_or_else(|| ExportError::OptionNotFound(option_id.to_string()))?;
        let revision = deal
            .revision_of_option(option_id)
            .ok_or_else(|| ExportError::OptionNotFound(option_id.to_string()))?;
        let totals = option.totals(settings.gst_rate);

        let rows = option
            .items
            .iter()
            .zip(&totals.line_totals)
            .enumerate()
            .map(|(index, (item, total))| DocumentRow {
                line: index + 1,
                sku: item.sku.clone(),
                name: item.name.clone(),
                notes: item.notes.clone(),
                quantity: item.quantity,
                unit_price: money(item.unit_price),
                discount: item.discount.normalize().to_string(),
                line_total: money(*total),
            })
            .collect();

        Ok(Self {
            project_name: deal.project_name.clone(),
            recipient: revision.recipient.clone(),
            revision: revision.revision,
            option_name: option.name.clone(),
            prepared_by: settings.prepared_by.clone(),
            date: settings.date.format("%d/%m/%Y").to_string(),
            currency: settings.currency.clone(),
            gst_percent: (settings.gst_rate * dec!(100)).normalize().to_string(),
            rows,
            subtotal: money(totals.subtotal),
            freight: money(totals.freight),
            grand_total: money(totals.grand_total),
            gst: money(totals.gst),
            total_inc_gst: money(totals.total_inc_gst),
        })
    }

    /// Suggested file name, e.g. `Tower_B-Acme-R2-Main_Option.html`
    pub fn file_name(&self, format: ExportFormat) -> String {
        let clean = |s: &str| {
            s.chars()
                .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
                .collect::<String>()
        };
        format!(
            "{}-{}-R{}-{}.{}",
            clean(&self.project_name),
            clean(&self.recipient),
            self.revision,
            clean(&self.option_name),
            format.extension()
        )
    }
}

/// Quote renderer over the embedded templates
pub struct Exporter {
    tera: Tera,
}

impl Exporter {
    pub fn new() -> Result<Self, ExportError> {
        let mut tera = Tera::default();
        tera.autoescape_on(vec![".html.tera"]);

        for file in EmbeddedTemplates::iter() {
            let filename = file.as_ref();
            if let Some(content) = EmbeddedTemplates::get(filename) {
                if let Ok(template_str) = std::str::from_utf8(&content.data) {
                    tera.add_raw_template(filename, template_str)
                        .map_err(|e| ExportError::Render(e.to_string()))?;
                }
            }
        }

        Ok(Self { tera })
    }

    pub fn render(&self, format: ExportFormat, document: &QuoteDocument) -> Result<String, ExportError> {
        let Some(name) = format.template() else {
            return render_csv(document);
        };
        if !self.tera.get_template_names().any(|n| n == name) {
            return Err(ExportError::TemplateNotFound(name.to_string()));
        }
        let context =
            tera::Context::from_serialize(document).map_err(|e| ExportError::Render(e.to_string()))?;
        self.tera
            .render(name, &context)
            .map_err(|e| ExportError::Render(e.to_string()))
    }
}

/// Line items as CSV, followed by the totals rows
pub fn render_csv(document: &QuoteDocument) -> Result<String, ExportError> {
    let csv_err = |e: csv::Error| ExportError::Csv(e.to_string());
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer
        .write_record(["line", "sku", "name", "quantity", "unit_price", "discount", "line_total"])
        .map_err(csv_err)?;
    for row in &document.rows {
        writer
            .write_record([
                row.line.to_string().as_str(),
                &row.sku,
                &row.name,
                row.quantity.to_string().as_str(),
                &row.unit_price,
                &row.discount,
                &row.line_total,
            ])
            .map_err(csv_err)?;
    }
    for (label, value) in [
        ("Subtotal", &document.subtotal),
        ("Freight", &document.freight),
        ("Total ex GST", &document.grand_total),
        ("GST", &document.gst),
        ("Total inc GST", &document.total_inc_gst),
    ] {
        writer
            .write_record(["", "", label, "", "", "", value.as_str()])
            .map_err(csv_err)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ExportError::Csv(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| ExportError::Csv(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::deal::{AustralianState, DealType, RevisionSource};
    use crate::entities::quote::LineItem;

    fn document() -> QuoteDocument {
        let mut deal = Deal::new("Tower B", DealType::Hvac, AustralianState::Nsw, "sam");
        let option = deal
            .new_revision("Acme Mechanical", RevisionSource::Blank)
            .unwrap()
            .options[0]
            .id
            .clone();
        let target = deal.option_mut(&option).unwrap();
        let mut pump = LineItem::product("NBG-65", "NBG 65-40-200, bare shaft", 2, dec!(4200));
        pump.discount = dec!(10);
        target.push_item(pump);
        target.push_item(LineItem::custom("Commissioning", 1, dec!(600)));
        target.freight_charge = dec!(150);

        let settings = DocumentSettings {
            prepared_by: "Sam Lee".to_string(),
            currency: "AUD".to_string(),
            gst_rate: dec!(0.10),
            date: NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
        };
        QuoteDocument::build(&deal, &option, &settings).unwrap()
    }

    #[test]
    fn test_document_totals() {
        let doc = document();
        assert_eq!(doc.rows.len(), 2);
        assert_eq!(doc.rows[0].line_total, "7560.00");
        assert_eq!(doc.subtotal, "8160.00");
        assert_eq!(doc.grand_total, "8310.00");
        assert_eq!(doc.gst, "831.00");
        assert_eq!(doc.total_inc_gst, "9141.00");
        assert_eq!(doc.gst_percent, "10");
        assert_eq!(doc.date, "05/03/2024");
        assert_eq!(
            doc.file_name(ExportFormat::Html),
            "Tower_B-Acme_Mechanical-R1-Main_Option.html"
        );
    }

    #[test]
    fn test_csv_export() {
        let csv = render_csv(&document()).unwrap();
        insta::assert_snapshot!(csv, @r###"
        line,sku,name,quantity,unit_price,discount,line_total
        1,NBG-65,"NBG 65-40-200, bare shaft",2,4200.00,10,7560.00
        2,CUSTOM,Commissioning,1,600.00,0,600.00
        ,,Subtotal,,,,8160.00
        ,,Freight,,,,150.00
        ,,Total ex GST,,,,8310.00
        ,,GST,,,,831.00
        ,,Total inc GST,,,,9141.00
        "###);
    }

    #[test]
    fn test_html_escapes_names() {
        let mut doc = document();
        doc.rows[1].name = "Valves <DN100>".to_string();
        let html = Exporter::new().unwrap().render(ExportFormat::Html, &doc).unwrap();
        assert!(html.contains("Valves &lt;DN100&gt;"));
        assert!(html.contains("9141.00"));
        assert!(html.contains("Acme Mechanical"));
    }

    #[test]
    fn test_markdown_export() {
        let md = Exporter::new().unwrap().render(ExportFormat::Md, &document()).unwrap();
        assert!(md.starts_with("# Quotation: Tower B"));
        assert!(md.contains("| 1 | NBG-65 | NBG 65-40-200, bare shaft | 2 | 4200.00 | 10% | 7560.00 |"));
        assert!(md.contains("**Total inc GST (AUD)** | 9141.00 |"));
    }
}
