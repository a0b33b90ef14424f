use bigdecimal::{BigDecimal, Zero};
use serde::{Deserialize, Serialize};

/// 识别服务返回的单个字段
///
/// 与文档识别服务的字段结构一致：可能带已解析的数值、货币值，或只有原文。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedField {
    #[serde(default)]
    pub value_number: Option<BigDecimal>,
    #[serde(default)]
    pub value_currency: Option<CurrencyValue>,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrencyValue {
    pub amount: BigDecimal,
    #[serde(default)]
    pub currency_code: Option<String>,
}

impl ExtractedField {
    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }
}

impl From<&str> for ExtractedField {
    fn from(content: &str) -> Self {
        Self {
            content: Some(content.to_string()),
            ..Default::default()
        }
    }
}

/// 识别出的一行发票明细 (字段组)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExtractedItem {
    #[serde(default)]
    pub description: Option<ExtractedField>,
    #[serde(default)]
    pub product_code: Option<ExtractedField>,
    #[serde(default)]
    pub quantity: Option<ExtractedField>,
    #[serde(default)]
    pub amount: Option<ExtractedField>,
    #[serde(default)]
    pub unit_price: Option<ExtractedField>,
    #[serde(default)]
    pub tax: Option<ExtractedField>,
    #[serde(default, rename = "CGST")]
    pub cgst: Option<ExtractedField>,
    #[serde(default, rename = "SGST")]
    pub sgst: Option<ExtractedField>,
}

/// 识别出的整张发票
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExtractedDocument {
    #[serde(default)]
    pub invoice_id: Option<ExtractedField>,
    #[serde(default)]
    pub sub_total: Option<ExtractedField>,
    #[serde(default)]
    pub invoice_total: Option<ExtractedField>,
    #[serde(default)]
    pub total_tax: Option<ExtractedField>,
    #[serde(default)]
    pub items: Vec<ExtractedItem>,
}

/// 发票抬头汇总
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub identifier: String,
    pub sub_total: BigDecimal,
    pub computed_tax: BigDecimal,
    pub grand_total: BigDecimal,
}

impl DocumentSummary {
    /// 税额优先取识别出的总税额；为 0 时用 价税合计 - 小计 推算
    pub fn from_totals(
        identifier: Option<&str>,
        sub_total: BigDecimal,
        grand_total: BigDecimal,
        total_tax: BigDecimal,
    ) -> Self {
        let computed_tax = if total_tax > BigDecimal::zero() {
            total_tax
        } else {
            &grand_total - &sub_total
        };
        let identifier = identifier
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or("N/A")
            .to_string();
        Self {
            identifier,
            sub_total,
            computed_tax: computed_tax.round(2),
            grand_total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn tax_falls_back_to_total_minus_subtotal() {
        let summary = DocumentSummary::from_totals(Some("INV-1"), dec("1000"), dec("1180.004"), dec("0"));
        assert_eq!(summary.computed_tax, dec("180.00"));

        let summary = DocumentSummary::from_totals(None, dec("1000"), dec("1180"), dec("175"));
        assert_eq!(summary.computed_tax, dec("175"));
        assert_eq!(summary.identifier, "N/A");
    }

    #[test]
    fn extracted_document_reads_service_json() {
        let json = r#"{
            "InvoiceId": {"content": "CR/24/0091"},
            "InvoiceTotal": {"value_currency": {"amount": "1180.00", "currency_code": "INR"}},
            "Items": [
                {"Description": {"content": "10 | G.CT1054 UTSS"}, "Amount": {"value_number": 950}, "CGST": {"content": "₹85.50"}}
            ]
        }"#;
        let doc: ExtractedDocument = serde_json::from_str(json).unwrap();
        assert_eq!(doc.invoice_id.as_ref().map(|f| f.text()), Some("CR/24/0091"));
        assert_eq!(doc.items.len(), 1);
        assert!(doc.items[0].cgst.is_some());
        assert!(doc.items[0].quantity.is_none());
    }
}
