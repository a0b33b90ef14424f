//! 待核对数据 (发票识别结果) 加载

use bigdecimal::{BigDecimal, Zero};
use indexmap::IndexSet;
use regex::Regex;
use std::sync::OnceLock;

use crate::loader::LoaderOptions;
use crate::models::{DocumentSummary, ExtractedDocument, ExtractedItem, LineItem};
use crate::service::normalizer::normalize;
use crate::service::numeric::{
    extract_number, extract_quantity_and_description, leading_unit_quantity,
};

/// 汇总 / 合计 / HSN 表头行的描述关键字
const SUMMARY_MARKERS: &[&str] = &["hsn", "summary", "total"];

fn embedded_code_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(?:Cat\s*Ref|Code|Ref|SKU|Item)\s*:?\s*([A-Z0-9]+)").expect("static regex")
    })
}

/// 从描述中找 `Cat Ref : CFHSGIN48TAP1S` 之类的编码
pub fn code_from_description(description: &str) -> Option<String> {
    embedded_code_re()
        .captures(description)
        .map(|caps| normalize(&caps[1]))
}

fn is_summary_row(description: &str) -> bool {
    let lowered = description.to_lowercase();
    SUMMARY_MARKERS.iter().any(|m| lowered.contains(m))
}

fn to_line_item(item: &ExtractedItem, options: &LoaderOptions) -> Option<LineItem> {
    let raw_description = item
        .description
        .as_ref()
        .map(|f| f.text().trim().to_string())
        .unwrap_or_default();

    let (mut quantity, description) = match &item.quantity {
        Some(field) => {
            let description = if raw_description.contains('|') {
                extract_quantity_and_description(&raw_description).1
            } else {
                raw_description.clone()
            };
            let mut quantity = extract_number(Some(field));
            if quantity.is_zero() {
                if let Some(q) = leading_unit_quantity(&raw_description) {
                    quantity = q;
                }
            }
            (quantity, description)
        }
        None => extract_quantity_and_description(&raw_description),
    };

    let amount = extract_number(item.amount.as_ref());

    if is_summary_row(&description) {
        tracing::debug!("skipping summary row '{}'", description);
        return None;
    }
    if description.is_empty() && amount.is_zero() {
        return None;
    }

    if quantity.is_zero() && options.missing_quantity_as_one {
        quantity = BigDecimal::from(1);
    }

    let split_tax = extract_number(item.cgst.as_ref()) + extract_number(item.sgst.as_ref());
    let tax = if split_tax > BigDecimal::zero() {
        split_tax
    } else {
        extract_number(item.tax.as_ref())
    };

    let explicit_code = item
        .product_code
        .as_ref()
        .map(|f| normalize(f.text()))
        .unwrap_or_default();
    let material_code = if explicit_code.is_empty() {
        code_from_description(&description).unwrap_or_default()
    } else {
        explicit_code
    };

    Some(LineItem::new(material_code, description, quantity, amount, tax))
}

/// 逐项惰性转换；只能遍历一次
pub fn candidate_items<'a>(
    document: &'a ExtractedDocument,
    options: &'a LoaderOptions,
) -> impl Iterator<Item = LineItem> + 'a {
    document
        .items
        .iter()
        .filter_map(move |item| to_line_item(item, options))
}

/// 物化并去重 (保序)
pub fn load_candidates(document: &ExtractedDocument, options: &LoaderOptions) -> Vec<LineItem> {
    let unique: IndexSet<LineItem> = candidate_items(document, options).collect();
    tracing::info!(
        "loaded {} candidate rows from {} extracted items",
        unique.len(),
        document.items.len()
    );
    unique.into_iter().collect()
}

pub fn document_summary(document: &ExtractedDocument) -> DocumentSummary {
    DocumentSummary::from_totals(
        document.invoice_id.as_ref().map(|f| f.text()),
        extract_number(document.sub_total.as_ref()),
        extract_number(document.invoice_total.as_ref()),
        extract_number(document.total_tax.as_ref()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ExtractedField;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn field(s: &str) -> Option<ExtractedField> {
        Some(s.into())
    }

    #[test]
    fn pipe_description_supplies_quantity() {
        let doc = ExtractedDocument {
            items: vec![ExtractedItem {
                description: field("10 | G.CT1054 UTSS"),
                amount: field("₹9,500.00"),
                cgst: field("855"),
                sgst: field("855"),
                ..Default::default()
            }],
            ..Default::default()
        };

        let items = load_candidates(&doc, &LoaderOptions::default());
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, dec("10"));
        assert_eq!(items[0].description, "G.CT1054 UTSS");
        assert_eq!(items[0].base_amount, dec("9500.00"));
        assert_eq!(items[0].tax_amount, dec("1710"));
        assert_eq!(items[0].total_amount, dec("11210"));
    }

    #[test]
    fn explicit_quantity_and_embedded_code() {
        let doc = ExtractedDocument {
            items: vec![ExtractedItem {
                description: field("Ceiling Fan Cat Ref : CFHSGIN48TAP1S"),
                quantity: field("0"),
                amount: field("4,200"),
                tax: field("756"),
                ..Default::default()
            }],
            ..Default::default()
        };

        let options = LoaderOptions {
            missing_quantity_as_one: true,
            ..Default::default()
        };
        let items = load_candidates(&doc, &options);
        assert_eq!(items[0].material_code, "CFHSGIN48TAP1S");
        assert_eq!(items[0].quantity, dec("1"));
        assert_eq!(items[0].tax_amount, dec("756"));
    }

    #[test]
    fn summary_and_empty_rows_are_skipped() {
        let doc = ExtractedDocument {
            items: vec![
                ExtractedItem {
                    description: field("HSN/SAC Summary"),
                    amount: field("100"),
                    ..Default::default()
                },
                ExtractedItem {
                    description: field("Sub Total"),
                    amount: field("100"),
                    ..Default::default()
                },
                ExtractedItem::default(),
                ExtractedItem {
                    product_code: field("ab12"),
                    amount: field("50"),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };

        let items = load_candidates(&doc, &LoaderOptions::default());
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].material_code, "AB12");
    }

    #[test]
    fn duplicates_collapse_in_order() {
        let line = |d: &str| ExtractedItem {
            description: field(d),
            quantity: field("1"),
            amount: field("10"),
            ..Default::default()
        };
        let doc = ExtractedDocument {
            items: vec![line("B item"), line("A item"), line("B item")],
            ..Default::default()
        };

        let items = load_candidates(&doc, &LoaderOptions::default());
        let descs: Vec<_> = items.iter().map(|i| i.description.as_str()).collect();
        assert_eq!(descs, vec!["B item", "A item"]);
    }

    #[test]
    fn summary_uses_total_tax_or_difference() {
        let doc = ExtractedDocument {
            invoice_id: field("GL/2024/118"),
            sub_total: field("1,000.00"),
            invoice_total: field("1,180.00"),
            ..Default::default()
        };
        let summary = document_summary(&doc);
        assert_eq!(summary.identifier, "GL/2024/118");
        assert_eq!(summary.computed_tax, dec("180"));
        assert_eq!(summary.grand_total, dec("1180"));
    }
}
