use bigdecimal::{BigDecimal, Zero};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::models::{
    CheckKind, DocumentCheck, DocumentSummary, LineItem, MatchResult, MatchStatus,
    ReconciliationSummary,
};
use crate::service::matcher::{MatchSettings, Matcher};

/// 一次对账的输出：逐行结果 (保持参考数据顺序) + 单据级汇总
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reconciliation {
    pub report: Vec<MatchResult>,
    pub summary: ReconciliationSummary,
}

impl Reconciliation {
    pub fn count(&self, status: MatchStatus) -> usize {
        self.report.iter().filter(|r| r.status == status).count()
    }
}

/// 批量对账中的一组独立输入
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileJob {
    pub reference_items: Vec<LineItem>,
    pub candidate_items: Vec<LineItem>,
    pub document: DocumentSummary,
    #[serde(default)]
    pub settings: Option<MatchSettings>,
}

/// 对账引擎
///
/// 对每条参考明细调用一次匹配器，候选池不因命中而缩减（同一候选可被多行复用）。
/// 准确率按子检查计分：每行 "是否找到" 1 分，找到后再计 数量 / 金额 各 1 分，
/// 另加 3 项单据级检查。
#[derive(Debug, Clone, Default)]
pub struct ReconciliationEngine {
    matcher: Matcher,
}

impl ReconciliationEngine {
    pub fn new(settings: MatchSettings) -> Self {
        Self {
            matcher: Matcher::new(settings),
        }
    }

    pub fn settings(&self) -> &MatchSettings {
        self.matcher.settings()
    }

    pub fn reconcile(
        &self,
        reference_items: &[LineItem],
        candidate_items: &[LineItem],
        document: &DocumentSummary,
    ) -> Reconciliation {
        tracing::info!(
            "Reconciling {} reference rows against {} candidates (invoice {})",
            reference_items.len(),
            candidate_items.len(),
            document.identifier
        );

        let mut total_checks = 0u32;
        let mut passed_checks = 0u32;
        let mut report = Vec::with_capacity(reference_items.len());

        for reference in reference_items {
            let result = self.matcher.find_match(reference, candidate_items);

            total_checks += 1;
            if result.is_found() {
                passed_checks += 1;
                total_checks += 2;
                passed_checks += u32::from(result.quantity_match) + u32::from(result.amount_match);
            }

            report.push(result);
        }

        let document_checks = self.document_checks(reference_items, document);
        total_checks += document_checks.len() as u32;
        passed_checks += document_checks.iter().filter(|c| c.passed).count() as u32;

        let summary = ReconciliationSummary::new(total_checks, passed_checks, document_checks);

        tracing::info!(
            "对账完成: 行数: {}, MATCH: {}, DIFF: {}, NOT_FOUND: {}, 准确率: {}%",
            report.len(),
            report.iter().filter(|r| r.status == MatchStatus::Match).count(),
            report.iter().filter(|r| r.status == MatchStatus::Diff).count(),
            report.iter().filter(|r| r.status == MatchStatus::NotFound).count(),
            summary.accuracy_pct
        );

        Reconciliation { report, summary }
    }

    fn document_checks(
        &self,
        reference_items: &[LineItem],
        document: &DocumentSummary,
    ) -> Vec<DocumentCheck> {
        let tolerance = &self.settings().tolerance;

        // 取第一条带单据号的参考行；发票号含有该单据号即算通过 (容忍前后缀噪声)
        let reference_id = reference_items
            .iter()
            .find_map(|item| item.document_ref.as_deref())
            .unwrap_or("");
        let id_match = !reference_id.is_empty() && document.identifier.contains(reference_id);

        let tax_sum = reference_items
            .iter()
            .fold(BigDecimal::zero(), |acc, item| acc + &item.tax_amount);
        let grand_total = reference_items
            .iter()
            .fold(BigDecimal::zero(), |acc, item| acc + &item.total_amount);

        let tax_match = (&tax_sum - &document.computed_tax).abs() <= *tolerance;
        let total_match = (&grand_total - &document.grand_total).abs() <= *tolerance;

        vec![
            DocumentCheck {
                kind: CheckKind::ReferenceId,
                reference_value: if reference_id.is_empty() {
                    "N/A".to_string()
                } else {
                    reference_id.to_string()
                },
                candidate_value: document.identifier.clone(),
                passed: id_match,
            },
            DocumentCheck {
                kind: CheckKind::TaxTotal,
                reference_value: tax_sum.round(2).to_string(),
                candidate_value: document.computed_tax.to_string(),
                passed: tax_match,
            },
            DocumentCheck {
                kind: CheckKind::GrandTotal,
                reference_value: grand_total.round(2).to_string(),
                candidate_value: document.grand_total.to_string(),
                passed: total_match,
            },
        ]
    }
}

/// 单次对账的便捷入口
pub fn reconcile(
    reference_items: &[LineItem],
    candidate_items: &[LineItem],
    document: &DocumentSummary,
    settings: &MatchSettings,
) -> Reconciliation {
    ReconciliationEngine::new(settings.clone()).reconcile(reference_items, candidate_items, document)
}

/// 批量对账：各组输入互不共享状态，用 rayon 并行处理，结果顺序与输入一致
pub fn reconcile_batch(jobs: &[ReconcileJob], defaults: &MatchSettings) -> Vec<Reconciliation> {
    jobs.par_iter()
        .map(|job| {
            let settings = job.settings.as_ref().unwrap_or(defaults);
            reconcile(&job.reference_items, &job.candidate_items, &job.document, settings)
        })
        .collect()
}
