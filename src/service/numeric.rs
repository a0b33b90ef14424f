//! 从噪声文本 / 识别字段中提取数值
//!
//! 单个单元格解析失败只回落为 0，不能中断整次对账。

use bigdecimal::{BigDecimal, Zero};
use regex::Regex;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::models::ExtractedField;

/// 识别字段取数：已解析数值 → 货币金额 → 原文清洗；缺失返回 0
pub fn extract_number(field: Option<&ExtractedField>) -> BigDecimal {
    let Some(field) = field else {
        return BigDecimal::zero();
    };

    if let Some(number) = &field.value_number {
        return number.clone();
    }
    if let Some(currency) = &field.value_currency {
        return currency.amount.clone();
    }

    parse_amount(field.text())
}

/// 去掉数字和小数点以外的所有字符后解析，失败返回 0
///
/// `"₹1,234.50"` → `1234.50`
pub fn parse_amount(text: &str) -> BigDecimal {
    let mut cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        return BigDecimal::zero();
    }
    if cleaned.starts_with('.') {
        cleaned.insert(0, '0');
    }
    if cleaned.ends_with('.') {
        cleaned.push('0');
    }

    match BigDecimal::from_str(&cleaned) {
        Ok(value) => value,
        Err(e) => {
            tracing::trace!("unparseable number {:?} ({}), using 0", text, e);
            BigDecimal::zero()
        }
    }
}

fn leading_quantity_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d+)\s+(.*)$").expect("static regex"))
}

fn unit_quantity_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^(\d+)\s*(?:NOS|PCS|UNITS?)?").expect("static regex"))
}

/// 拆分 `"10 | G.CT1054 UTSS"` 这类复合字段为 (数量, 描述)
///
/// 有 `|` 时取第一段的数字为数量，其余各段拼接为描述；
/// 否则尝试 "整数 + 空白 + 文本"；都不匹配则数量为 0，原文为描述。
pub fn extract_quantity_and_description(text: &str) -> (BigDecimal, String) {
    let text = text.trim();
    if text.is_empty() {
        return (BigDecimal::zero(), String::new());
    }

    if let Some((head, rest)) = text.split_once('|') {
        let description = rest
            .split('|')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        return (parse_amount(head), description);
    }

    if let Some(caps) = leading_quantity_re().captures(text) {
        return (parse_amount(&caps[1]), caps[2].trim().to_string());
    }

    (BigDecimal::zero(), text.to_string())
}

/// 描述开头的 "<n> NOS/PCS/UNITS" 数量，找不到返回 None
pub fn leading_unit_quantity(text: &str) -> Option<BigDecimal> {
    unit_quantity_re()
        .captures(text.trim())
        .map(|caps| parse_amount(&caps[1]))
}
