use bigdecimal::{BigDecimal, Zero};
use serde::{Deserialize, Serialize};

/// 明细来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// 权威数据 (采购订单 Excel)
    Reference,
    /// 待核对数据 (发票识别结果)
    Candidate,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Reference => "reference",
            SourceKind::Candidate => "candidate",
        }
    }
}

/// 对账明细行
///
/// 加载时构建一次，之后只读。数量和金额在构建时被钳制为非负数。
/// 反序列化同样经过构造函数，请求体里的明细也满足这两条约束。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "RawLineItem")]
pub struct LineItem {
    pub material_code: String,
    pub description: String,
    pub quantity: BigDecimal,
    pub base_amount: BigDecimal,
    pub tax_amount: BigDecimal,
    pub total_amount: BigDecimal,
    /// 单据号 (PO Ref No.)，仅参考数据携带
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_ref: Option<String>,
}

impl LineItem {
    /// 已知不含税金额和税额，合计 = 不含税 + 税额
    pub fn new(
        material_code: impl Into<String>,
        description: impl Into<String>,
        quantity: BigDecimal,
        base_amount: BigDecimal,
        tax_amount: BigDecimal,
    ) -> Self {
        let base_amount = non_negative(base_amount);
        let tax_amount = non_negative(tax_amount);
        let total_amount = &base_amount + &tax_amount;
        Self {
            material_code: material_code.into(),
            description: description.into(),
            quantity: non_negative(quantity),
            base_amount,
            tax_amount,
            total_amount,
            document_ref: None,
        }
    }

    /// 已知含税合计和税额，不含税 = 合计 - 税额 (不低于 0)
    pub fn from_total(
        material_code: impl Into<String>,
        description: impl Into<String>,
        quantity: BigDecimal,
        total_amount: BigDecimal,
        tax_amount: BigDecimal,
    ) -> Self {
        let total_amount = non_negative(total_amount);
        let tax_amount = non_negative(tax_amount);
        let base_amount = non_negative(&total_amount - &tax_amount);
        Self {
            material_code: material_code.into(),
            description: description.into(),
            quantity: non_negative(quantity),
            base_amount,
            tax_amount,
            total_amount,
            document_ref: None,
        }
    }

    pub fn with_document_ref(mut self, document_ref: impl Into<String>) -> Self {
        let document_ref = document_ref.into();
        let trimmed = document_ref.trim();
        self.document_ref = if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        };
        self
    }

    pub fn has_tax(&self) -> bool {
        self.tax_amount > BigDecimal::zero()
    }
}

/// 请求体中的明细：给了不含税金额就以它为准重新推算合计，否则由合计反推
#[derive(Debug, Deserialize)]
struct RawLineItem {
    #[serde(default)]
    material_code: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    quantity: Option<BigDecimal>,
    #[serde(default)]
    base_amount: Option<BigDecimal>,
    #[serde(default)]
    tax_amount: Option<BigDecimal>,
    #[serde(default)]
    total_amount: Option<BigDecimal>,
    #[serde(default)]
    document_ref: Option<String>,
}

impl From<RawLineItem> for LineItem {
    fn from(raw: RawLineItem) -> Self {
        let quantity = raw.quantity.unwrap_or_else(BigDecimal::zero);
        let tax_amount = raw.tax_amount.unwrap_or_else(BigDecimal::zero);
        let item = match (raw.base_amount, raw.total_amount) {
            (Some(base), _) => {
                LineItem::new(raw.material_code, raw.description, quantity, base, tax_amount)
            }
            (None, Some(total)) => {
                LineItem::from_total(raw.material_code, raw.description, quantity, total, tax_amount)
            }
            (None, None) => LineItem::new(
                raw.material_code,
                raw.description,
                quantity,
                BigDecimal::zero(),
                tax_amount,
            ),
        };
        item.with_document_ref(raw.document_ref.unwrap_or_default())
    }
}

fn non_negative(value: BigDecimal) -> BigDecimal {
    if value < BigDecimal::zero() {
        BigDecimal::zero()
    } else {
        value
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
    fn new_derives_total() {
        let item = LineItem::new("A1", "widget", dec("2"), dec("100"), dec("18"));
        assert_eq!(item.total_amount, dec("118"));
    }

    #[test]
    fn from_total_derives_base_and_clamps() {
        let item = LineItem::from_total("A1", "widget", dec("2"), dec("118"), dec("18"));
        assert_eq!(item.base_amount, dec("100"));

        let odd = LineItem::from_total("A1", "widget", dec("-1"), dec("10"), dec("18"));
        assert_eq!(odd.base_amount, BigDecimal::zero());
        assert_eq!(odd.quantity, BigDecimal::zero());
    }

    #[test]
    fn deserialized_rows_are_clamped_and_totalled() {
        let item: LineItem = serde_json::from_str(
            r#"{"material_code":"AB1","description":"fan","quantity":"-3","base_amount":"-50","total_amount":"999"}"#,
        )
        .unwrap();
        assert_eq!(item.quantity, BigDecimal::zero());
        assert_eq!(item.base_amount, BigDecimal::zero());
        assert_eq!(item.total_amount, BigDecimal::zero());

        // 合计与 不含税 + 税额 不一致时以后者为准
        let item: LineItem = serde_json::from_str(
            r#"{"material_code":"AB1","description":"fan","quantity":"1","base_amount":"100","tax_amount":"18","total_amount":"999"}"#,
        )
        .unwrap();
        assert_eq!(item.total_amount, dec("118"));

        let item: LineItem = serde_json::from_str(
            r#"{"material_code":"AB1","description":"","quantity":2,"tax_amount":"18","total_amount":"118","document_ref":" PO-9 "}"#,
        )
        .unwrap();
        assert_eq!(item.base_amount, dec("100"));
        assert_eq!(item.document_ref.as_deref(), Some("PO-9"));
    }

    #[test]
    fn serialized_rows_read_back_unchanged() {
        let item = LineItem::from_total("A1", "widget", dec("2"), dec("118"), dec("18"))
            .with_document_ref("PO-1");
        let json = serde_json::to_string(&item).unwrap();
        let back: LineItem = serde_json::from_str(&json).unwrap();
        assert_eq!(back, item);
    }

    #[test]
    fn blank_document_ref_is_dropped() {
        let item = LineItem::new("A1", "", dec("1"), dec("1"), dec("0")).with_document_ref("  ");
        assert!(item.document_ref.is_none());
        let item = item.with_document_ref(" PO-77 ");
        assert_eq!(item.document_ref.as_deref(), Some("PO-77"));
    }
}
