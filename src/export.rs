//! 对账报告表格化与 CSV 导出

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::fs::File;
use std::path::{Path, PathBuf};

use crate::models::{MatchResult, ReconciliationSummary};
use crate::service::Reconciliation;

const DESCRIPTION_WIDTH: usize = 50;

fn money(value: &BigDecimal) -> String {
    value.round(2).with_scale(2).to_string()
}

fn glyph(ok: bool) -> &'static str {
    if ok {
        "✅"
    } else {
        "❌"
    }
}

/// 报告表的一行
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRow {
    #[serde(rename = "Material Code")]
    pub material_code: String,
    #[serde(rename = "Matched Description")]
    pub matched_description: String,
    #[serde(rename = "Qty Excel")]
    pub quantity_reference: String,
    #[serde(rename = "Qty Candidate")]
    pub quantity_candidate: String,
    #[serde(rename = "Qty Status")]
    pub quantity_status: String,
    #[serde(rename = "Amount Excel")]
    pub amount_reference: String,
    #[serde(rename = "Amount Candidate")]
    pub amount_candidate: String,
    #[serde(rename = "Amount Status")]
    pub amount_status: String,
    #[serde(rename = "Match")]
    pub status: String,
}

impl From<&MatchResult> for ReportRow {
    fn from(result: &MatchResult) -> Self {
        let reference = &result.reference;
        let (description, quantity, amount) = match &result.candidate {
            Some(c) => (
                c.description.chars().take(DESCRIPTION_WIDTH).collect(),
                c.quantity.to_string(),
                money(&c.total_amount),
            ),
            None => ("NOT FOUND".to_string(), "0".to_string(), "0".to_string()),
        };

        Self {
            material_code: reference.material_code.clone(),
            matched_description: description,
            quantity_reference: reference.quantity.to_string(),
            quantity_candidate: quantity,
            quantity_status: glyph(result.quantity_match).to_string(),
            amount_reference: money(&reference.total_amount),
            amount_candidate: amount,
            amount_status: glyph(result.amount_match).to_string(),
            status: result.status.glyph().to_string(),
        }
    }
}

/// 汇总表的一行
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryRow {
    #[serde(rename = "Metric")]
    pub metric: String,
    #[serde(rename = "Excel")]
    pub reference: String,
    #[serde(rename = "Candidate")]
    pub candidate: String,
    #[serde(rename = "Status")]
    pub status: String,
}

pub fn report_rows(report: &[MatchResult]) -> Vec<ReportRow> {
    report.iter().map(ReportRow::from).collect()
}

/// 单据级检查 + 准确率
pub fn summary_rows(summary: &ReconciliationSummary) -> Vec<SummaryRow> {
    let mut rows: Vec<SummaryRow> = summary
        .document_checks
        .iter()
        .map(|check| SummaryRow {
            metric: check.kind.label().to_string(),
            reference: check.reference_value.clone(),
            candidate: check.candidate_value.clone(),
            status: check.glyph().to_string(),
        })
        .collect();

    rows.push(SummaryRow {
        metric: "Overall Accuracy".to_string(),
        reference: format!("{}/{}", summary.passed_checks, summary.total_checks),
        candidate: String::new(),
        status: format!("{:.2}%", summary.accuracy_pct),
    });
    rows
}

pub fn write_csv<W: Write, T: Serialize>(rows: &[T], writer: W) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(writer);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// 导出报告表和汇总表到目录下的两个 CSV 文件，返回 (报告路径, 汇总路径)
pub fn export_to_csv(
    reconciliation: &Reconciliation,
    output_dir: &Path,
    stem: &str,
) -> crate::error::Result<(PathBuf, PathBuf)> {
    let report_path = output_dir.join(format!("{stem}_report.csv"));
    let summary_path = output_dir.join(format!("{stem}_summary.csv"));

    write_csv(&report_rows(&reconciliation.report), File::create(&report_path)?)?;
    write_csv(&summary_rows(&reconciliation.summary), File::create(&summary_path)?)?;

    tracing::info!("Exported report to {} and {}", report_path.display(), summary_path.display());
    Ok((report_path, summary_path))
}
