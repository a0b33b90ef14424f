//! 数据源 → 规范化明细行
//!
//! 只有加载失败 ([`LoadError`]) 会中断整次对账。

pub mod candidate;
pub mod reference;
pub mod sheet;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::LoadError;
use crate::models::{ExtractedDocument, LineItem, SourceKind};

pub use candidate::{candidate_items, document_summary, load_candidates};
pub use sheet::{read_grid, Grid};

/// 加载参数
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderOptions {
    /// 表头行中必须出现的文字
    pub header_marker: String,
    /// 参考编码上要去掉的供应商前缀
    pub strip_prefixes: Vec<String>,
    /// 识别不出数量时按 1 计
    pub missing_quantity_as_one: bool,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            header_marker: "SKU".to_string(),
            strip_prefixes: Vec::new(),
            missing_quantity_as_one: false,
        }
    }
}

/// 数据源
#[derive(Debug, Clone)]
pub enum Source {
    /// 已在内存中的表格 (如请求体)
    Grid { name: String, rows: Grid },
    /// 表格文件 (.xlsx / .xls / .ods / .csv) 或识别结果 JSON 文件
    File(PathBuf),
    /// 已在内存中的识别结果
    Extracted { name: String, document: ExtractedDocument },
}

impl Source {
    pub fn name(&self) -> String {
        match self {
            Source::Grid { name, .. } | Source::Extracted { name, .. } => name.clone(),
            Source::File(path) => path.display().to_string(),
        }
    }
}

pub fn load(
    source: &Source,
    kind: SourceKind,
    options: &LoaderOptions,
) -> Result<Vec<LineItem>, LoadError> {
    match (kind, source) {
        (SourceKind::Reference, Source::Grid { name, rows }) => {
            reference::load_rows(name, rows, options)
        }
        (SourceKind::Reference, Source::File(path)) => {
            let grid = read_grid(path)?;
            reference::load_rows(&source.name(), &grid, options)
        }
        (SourceKind::Candidate, Source::Extracted { document, .. }) => {
            Ok(load_candidates(document, options))
        }
        (SourceKind::Candidate, Source::File(path)) => {
            let document = read_extracted(path)?;
            Ok(load_candidates(&document, options))
        }
        (kind, other) => Err(LoadError::KindMismatch {
            source_name: other.name(),
            expected: kind.as_str(),
        }),
    }
}

/// 读取识别服务导出的 JSON
pub fn read_extracted(path: &std::path::Path) -> Result<ExtractedDocument, LoadError> {
    let source_name = path.display().to_string();
    let text = std::fs::read_to_string(path).map_err(|e| LoadError::Unreadable {
        source_name: source_name.clone(),
        reason: e.to_string(),
    })?;
    serde_json::from_str(&text).map_err(|e| LoadError::Unreadable {
        source_name,
        reason: e.to_string(),
    })
}
