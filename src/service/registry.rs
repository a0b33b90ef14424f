//! 对账工具注册表
//!
//! 每个工具用稳定的字符串键注册，入口是纯函数 `run(ctx, input) -> output`；
//! 会话上下文由宿主显式传入，工具之间不共享任何状态。

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::AppError;
use crate::export::{report_rows, summary_rows, ReportRow, SummaryRow};
use crate::loader::{self, Grid, LoaderOptions, Source};
use crate::models::{ExtractedDocument, SourceKind};
use crate::service::engine::{Reconciliation, ReconciliationEngine};
use crate::service::matcher::MatchSettings;

/// 单次运行的上下文，由宿主创建
#[derive(Debug, Clone, Serialize)]
pub struct RunContext {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    /// 宿主配置的默认比对参数
    pub settings: MatchSettings,
    pub header_marker: String,
}

impl RunContext {
    pub fn new(tool_key: &str, settings: MatchSettings, header_marker: impl Into<String>) -> Self {
        let started_at = Utc::now();
        Self {
            run_id: format!("{}-{}", tool_key, started_at.format("%Y%m%d%H%M%S%3f")),
            started_at,
            settings,
            header_marker: header_marker.into(),
        }
    }
}

/// 参考数据：请求体内的表格，或服务器本地文件
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReferenceInput {
    Rows {
        #[serde(default)]
        name: Option<String>,
        rows: Grid,
    },
    Path {
        path: PathBuf,
    },
}

impl ReferenceInput {
    fn into_source(self) -> Source {
        match self {
            ReferenceInput::Rows { name, rows } => Source::Grid {
                name: name.unwrap_or_else(|| "reference".to_string()),
                rows,
            },
            ReferenceInput::Path { path } => Source::File(path),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInput {
    pub reference: ReferenceInput,
    pub candidate: ExtractedDocument,
    /// 覆盖工具默认容差
    #[serde(default)]
    pub tolerance: Option<BigDecimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutput {
    pub tool: String,
    pub run_id: String,
    pub invoice_no: String,
    /// 本次实际使用的比对参数
    pub settings: MatchSettings,
    pub reconciliation: Reconciliation,
    pub table: Vec<ReportRow>,
    pub summary_table: Vec<SummaryRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub key: String,
    pub title: String,
    pub default_tolerance: u32,
}

pub trait ReconTool: Send + Sync {
    fn key(&self) -> &'static str;
    fn title(&self) -> &'static str;
    fn default_tolerance(&self) -> u32;
    fn run(&self, ctx: &RunContext, input: ToolInput) -> Result<ToolOutput, AppError>;
}

/// 供应商对账配置：PO 表格 vs 发票识别结果
#[derive(Debug, Clone)]
pub struct VendorProfile {
    pub key: &'static str,
    pub title: &'static str,
    pub strip_prefixes: &'static [&'static str],
    pub default_tolerance: u32,
    pub missing_quantity_as_one: bool,
}

impl VendorProfile {
    fn loader_options(&self, ctx: &RunContext) -> LoaderOptions {
        LoaderOptions {
            header_marker: ctx.header_marker.clone(),
            strip_prefixes: self.strip_prefixes.iter().map(|p| p.to_string()).collect(),
            missing_quantity_as_one: self.missing_quantity_as_one,
        }
    }
}

impl ReconTool for VendorProfile {
    fn key(&self) -> &'static str {
        self.key
    }

    fn title(&self) -> &'static str {
        self.title
    }

    fn default_tolerance(&self) -> u32 {
        self.default_tolerance
    }

    fn run(&self, ctx: &RunContext, input: ToolInput) -> Result<ToolOutput, AppError> {
        // 容差：请求 > 供应商默认；编辑距离取宿主配置
        let settings = MatchSettings::new(
            input
                .tolerance
                .unwrap_or_else(|| BigDecimal::from(self.default_tolerance)),
            ctx.settings.max_edits,
        )?;

        let options = self.loader_options(ctx);

        let reference_source = input.reference.into_source();
        let reference_items = loader::load(&reference_source, SourceKind::Reference, &options)?;

        let summary = loader::document_summary(&input.candidate);
        let candidate_source = Source::Extracted {
            name: format!("invoice {}", summary.identifier),
            document: input.candidate,
        };
        let candidate_items = loader::load(&candidate_source, SourceKind::Candidate, &options)?;

        tracing::info!(
            "[{}] run {}: {} reference rows, {} candidates, tolerance {}",
            self.key,
            ctx.run_id,
            reference_items.len(),
            candidate_items.len(),
            settings.tolerance
        );

        let reconciliation = ReconciliationEngine::new(settings.clone()).reconcile(
            &reference_items,
            &candidate_items,
            &summary,
        );

        Ok(ToolOutput {
            tool: self.key.to_string(),
            run_id: ctx.run_id.clone(),
            invoice_no: summary.identifier.clone(),
            settings,
            table: report_rows(&reconciliation.report),
            summary_table: summary_rows(&reconciliation.summary),
            reconciliation,
        })
    }
}

/// 内置供应商
pub const BUILTIN_PROFILES: &[VendorProfile] = &[
    VendorProfile {
        key: "crompton",
        title: "Crompton PO vs Invoice",
        strip_prefixes: &["CR-", "WO-"],
        default_tolerance: 15,
        missing_quantity_as_one: true,
    },
    VendorProfile {
        key: "glen",
        title: "Glen PO vs Invoice",
        strip_prefixes: &["TR-", "WO-"],
        default_tolerance: 7,
        missing_quantity_as_one: false,
    },
    // 只复用编码比对引擎；描述相似度比对不在此列
    VendorProfile {
        key: "trishna",
        title: "Trishna PO vs Invoice",
        strip_prefixes: &["TR-", "WO-"],
        default_tolerance: 1,
        missing_quantity_as_one: false,
    },
    VendorProfile {
        key: "bajaj",
        title: "Bajaj PO vs Invoice",
        strip_prefixes: &["BA-", "WO-"],
        default_tolerance: 1,
        missing_quantity_as_one: false,
    },
];

/// 键 → 工具，保持注册顺序
pub struct ToolRegistry {
    tools: IndexMap<&'static str, Box<dyn ReconTool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: IndexMap::new(),
        }
    }

    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for profile in BUILTIN_PROFILES {
            registry.register(Box::new(profile.clone()));
        }
        registry
    }

    /// 同键重复注册时后者覆盖前者
    pub fn register(&mut self, tool: Box<dyn ReconTool>) {
        if self.tools.insert(tool.key(), tool).is_some() {
            tracing::warn!("tool registration replaced an existing entry");
        }
    }

    pub fn get(&self, key: &str) -> Option<&dyn ReconTool> {
        self.tools.get(key).map(|t| t.as_ref())
    }

    pub fn list(&self) -> Vec<ToolInfo> {
        self.tools
            .values()
            .map(|t| ToolInfo {
                key: t.key().to_string(),
                title: t.title().to_string(),
                default_tolerance: t.default_tolerance(),
            })
            .collect()
    }

    pub fn run(&self, key: &str, ctx: &RunContext, input: ToolInput) -> Result<ToolOutput, AppError> {
        let tool = self
            .get(key)
            .ok_or_else(|| AppError::UnknownTool(key.to_string()))?;
        tool.run(ctx, input)
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
