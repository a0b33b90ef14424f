//! 物料编码规范化与模糊比对
//!
//! 扫描件 / 打印件经 OCR 后常把 `1` 识别为 `I`、`0` 识别为 `O`（或反之），
//! 只做精确比对会静默漏配。

/// OCR 易混淆字符，每组折叠为右侧代表字符
const CONFUSABLE: &[(char, char)] = &[('1', 'I'), ('0', 'O')];

/// 去首尾空白并转大写；空输入返回空串
pub fn normalize(code: &str) -> String {
    code.trim().to_uppercase()
}

/// 把易混淆字符折叠为同一代表字符
fn fold_confusable(code: &str) -> String {
    code.chars()
        .map(|c| {
            CONFUSABLE
                .iter()
                .find(|(from, _)| *from == c)
                .map(|(_, to)| *to)
                .unwrap_or(c)
        })
        .collect()
}

/// 判断两个编码是否 "足够相似"
///
/// 依次尝试：规范化后相等 → 折叠易混淆字符后相等 → 等长且逐位差异不超过 `max_edits`。
pub fn are_similar(code_a: &str, code_b: &str, max_edits: usize) -> bool {
    let a = normalize(code_a);
    let b = normalize(code_b);

    if a == b {
        return true;
    }

    if fold_confusable(&a) == fold_confusable(&b) {
        return true;
    }

    if a.chars().count() == b.chars().count() {
        let mismatches = a.chars().zip(b.chars()).filter(|(x, y)| x != y).count();
        return mismatches <= max_edits;
    }

    false
}

/// 只保留字母和数字
pub fn alphanumeric_only(text: &str) -> String {
    text.chars().filter(|c| c.is_alphanumeric()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_trims_and_uppercases() {
        assert_eq!(normalize("  cr-12ab "), "CR-12AB");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn ocr_confusion_is_similar() {
        assert!(are_similar("CFHSG1N48", "CFHSGIN48", 1));
        assert!(are_similar("AB0O1I", "ABO01I", 0));
        assert!(are_similar("abc", " ABC ", 0));
    }

    #[test]
    fn one_positional_edit_is_tolerated() {
        assert!(are_similar("GCT1054", "GCT1064", 1));
        assert!(!are_similar("GCT1054", "GCT1364", 1));
        assert!(are_similar("GCT1054", "GCT1364", 2));
    }

    #[test]
    fn unrelated_codes_are_not_similar() {
        assert!(!are_similar("ABC123", "XYZ999", 1));
        assert!(!are_similar("ABC123", "ABC1234", 1));
    }

    #[test]
    fn alphanumeric_only_strips_punctuation() {
        assert_eq!(alphanumeric_only("G.CT-1054 / UTSS"), "GCT1054UTSS");
    }
}
