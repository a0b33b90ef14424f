use serde::{Deserialize, Serialize};

/// 单据级核对项
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    /// PO 号是否出现在发票号中
    ReferenceId,
    /// 税额合计
    TaxTotal,
    /// 价税合计
    GrandTotal,
}

impl CheckKind {
    pub fn label(&self) -> &'static str {
        match self {
            CheckKind::ReferenceId => "PO Ref vs Invoice",
            CheckKind::TaxTotal => "Total Tax Comparison",
            CheckKind::GrandTotal => "Grand Total Comparison",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentCheck {
    pub kind: CheckKind,
    pub reference_value: String,
    pub candidate_value: String,
    pub passed: bool,
}

impl DocumentCheck {
    pub fn glyph(&self) -> &'static str {
        if self.passed {
            "✅"
        } else {
            "❌"
        }
    }
}

/// 单据级汇总，一次对账生成一次
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationSummary {
    pub total_checks: u32,
    pub passed_checks: u32,
    pub accuracy_pct: f64,
    pub document_checks: Vec<DocumentCheck>,
}

impl ReconciliationSummary {
    pub fn new(total_checks: u32, passed_checks: u32, document_checks: Vec<DocumentCheck>) -> Self {
        let accuracy_pct = if total_checks == 0 {
            0.0
        } else {
            let raw = 100.0 * f64::from(passed_checks) / f64::from(total_checks);
            (raw * 100.0).round() / 100.0
        };
        Self {
            total_checks,
            passed_checks,
            accuracy_pct,
            document_checks,
        }
    }

    pub fn check(&self, kind: CheckKind) -> Option<&DocumentCheck> {
        self.document_checks.iter().find(|c| c.kind == kind)
    }
}
