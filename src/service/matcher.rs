use bigdecimal::{BigDecimal, Zero};
use serde::{Deserialize, Serialize};

use crate::error::SettingsError;
use crate::models::{LineItem, MatchResult, MatchStrategy};
use crate::service::normalizer::{alphanumeric_only, are_similar, normalize};

/// 比对参数；容差不能为负，反序列化时同样校验
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawMatchSettings")]
pub struct MatchSettings {
    /// 金额允许的绝对误差 (货币单位)
    pub tolerance: BigDecimal,
    /// 模糊编码比对允许的逐位差异数
    pub max_edits: usize,
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self {
            tolerance: BigDecimal::from(7),
            max_edits: 1,
        }
    }
}

impl MatchSettings {
    pub fn new(tolerance: BigDecimal, max_edits: usize) -> Result<Self, SettingsError> {
        if tolerance < BigDecimal::zero() {
            return Err(SettingsError::NegativeTolerance(tolerance));
        }
        Ok(Self {
            tolerance,
            max_edits,
        })
    }

    /// 用请求给出的值覆盖默认值
    pub fn with_overrides(
        &self,
        tolerance: Option<BigDecimal>,
        max_edits: Option<usize>,
    ) -> Result<Self, SettingsError> {
        Self::new(
            tolerance.unwrap_or_else(|| self.tolerance.clone()),
            max_edits.unwrap_or(self.max_edits),
        )
    }
}

#[derive(Deserialize)]
struct RawMatchSettings {
    tolerance: BigDecimal,
    #[serde(default = "default_max_edits")]
    max_edits: usize,
}

fn default_max_edits() -> usize {
    1
}

impl TryFrom<RawMatchSettings> for MatchSettings {
    type Error = SettingsError;

    fn try_from(raw: RawMatchSettings) -> Result<Self, Self::Error> {
        MatchSettings::new(raw.tolerance, raw.max_edits)
    }
}

/// 单行匹配器
///
/// 策略按代价从低到高依次尝试，第一个命中的候选即为结果：
/// 1. 编码精确相等
/// 2. 编码模糊相似 (OCR 混淆 / 单字符差异)
/// 3. 描述中包含编码
/// 4. 去掉标点后描述中包含编码
///
/// 同一策略下取候选序列中第一个命中者，不做打分择优。
/// 选中候选后数量、金额只与该候选比较，比较失败也不再尝试后续策略。
#[derive(Debug, Clone)]
pub struct Matcher {
    settings: MatchSettings,
}

impl Matcher {
    pub fn new(settings: MatchSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &MatchSettings {
        &self.settings
    }

    pub fn find_match(&self, reference: &LineItem, candidates: &[LineItem]) -> MatchResult {
        let Some((candidate, strategy)) = self.select(reference, candidates) else {
            tracing::debug!("{}: no candidate found", reference.material_code);
            return MatchResult::not_found(reference.clone());
        };

        tracing::debug!(
            "{}: matched '{}' via {:?}",
            reference.material_code, candidate.description, strategy
        );

        // 数量严格相等，OCR 数量误差不做容差吸收
        let quantity_match = reference.quantity == candidate.quantity;
        let amount_match = self.amounts_agree(reference, candidate);

        MatchResult::matched(
            reference.clone(),
            candidate.clone(),
            strategy,
            quantity_match,
            amount_match,
        )
    }

    fn select<'a>(
        &self,
        reference: &LineItem,
        candidates: &'a [LineItem],
    ) -> Option<(&'a LineItem, MatchStrategy)> {
        let code = normalize(&reference.material_code);
        if code.is_empty() {
            return None;
        }

        if let Some(c) = candidates
            .iter()
            .find(|c| normalize(&c.material_code) == code)
        {
            return Some((c, MatchStrategy::ExactCode));
        }

        if let Some(c) = candidates.iter().find(|c| {
            !c.material_code.trim().is_empty()
                && are_similar(&c.material_code, &code, self.settings.max_edits)
        }) {
            return Some((c, MatchStrategy::FuzzyCode));
        }

        let lowered = code.to_lowercase();
        if let Some(c) = candidates
            .iter()
            .find(|c| c.description.to_lowercase().contains(&lowered))
        {
            return Some((c, MatchStrategy::CodeInDescription));
        }

        let stripped = alphanumeric_only(&code).to_lowercase();
        if stripped.is_empty() {
            return None;
        }
        candidates
            .iter()
            .find(|c| alphanumeric_only(&c.description).to_lowercase().contains(&stripped))
            .map(|c| (c, MatchStrategy::NormalizedSubstring))
    }

    /// 含税合计对候选不含税金额、对候选含税金额、或不含税对不含税，任一在容差内即算一致
    fn amounts_agree(&self, reference: &LineItem, candidate: &LineItem) -> bool {
        let within = |a: &BigDecimal, b: &BigDecimal| (a - b).abs() <= self.settings.tolerance;

        within(&reference.total_amount, &candidate.base_amount)
            || (candidate.has_tax() && within(&reference.total_amount, &candidate.total_amount))
            || (reference.has_tax() && within(&reference.base_amount, &candidate.base_amount))
    }
}

impl Default for Matcher {
    fn default() -> Self {
        Self::new(MatchSettings::default())
    }
}
