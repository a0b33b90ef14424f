use serde::{Deserialize, Serialize};

use super::LineItem;

/// 命中候选所用的匹配策略，按尝试顺序排列
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    ExactCode,
    FuzzyCode,
    CodeInDescription,
    NormalizedSubstring,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchStatus {
    Match,
    Diff,
    NotFound,
}

impl MatchStatus {
    pub fn glyph(&self) -> &'static str {
        match self {
            MatchStatus::Match => "✅ MATCH",
            MatchStatus::Diff => "⚠️ DIFF",
            MatchStatus::NotFound => "❌ NOT_FOUND",
        }
    }
}

/// 单行对账结果
///
/// 只能通过 [`MatchResult::matched`] / [`MatchResult::not_found`] 构建，
/// 保证 `status` 与 `candidate` / 两个比对结果一致。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub reference: LineItem,
    pub candidate: Option<LineItem>,
    pub strategy_used: MatchStrategy,
    pub quantity_match: bool,
    pub amount_match: bool,
    pub status: MatchStatus,
}

impl MatchResult {
    pub fn matched(
        reference: LineItem,
        candidate: LineItem,
        strategy_used: MatchStrategy,
        quantity_match: bool,
        amount_match: bool,
    ) -> Self {
        let status = if quantity_match && amount_match {
            MatchStatus::Match
        } else {
            MatchStatus::Diff
        };
        Self {
            reference,
            candidate: Some(candidate),
            strategy_used,
            quantity_match,
            amount_match,
            status,
        }
    }

    pub fn not_found(reference: LineItem) -> Self {
        Self {
            reference,
            candidate: None,
            strategy_used: MatchStrategy::None,
            quantity_match: false,
            amount_match: false,
            status: MatchStatus::NotFound,
        }
    }

    pub fn is_found(&self) -> bool {
        self.candidate.is_some()
    }
}
