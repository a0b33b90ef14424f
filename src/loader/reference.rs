//! 参考数据 (采购订单表格) 加载
//!
//! 先扫描出含标记文字的表头行，再按表头名称映射字段；名称找不到时退回固定列位并告警，
//! 两者都不成立则整次加载失败。

use crate::error::LoadError;
use crate::loader::sheet::Grid;
use crate::loader::LoaderOptions;
use crate::models::LineItem;
use crate::service::normalizer::normalize;
use crate::service::numeric::parse_amount;

/// 物料编码规范化后视为空行的占位值
const EMPTY_CODE_SENTINELS: &[&str] = &["", "NAN"];

struct ColumnSpec {
    field: &'static str,
    aliases: &'static [&'static str],
    fallback: usize,
}

const COLUMNS: [ColumnSpec; 6] = [
    ColumnSpec {
        field: "material_code",
        aliases: &["material code", "sku", "sku code", "item code", "article code"],
        fallback: 0,
    },
    ColumnSpec {
        field: "description",
        aliases: &["description", "item description", "product description", "sku description"],
        fallback: 1,
    },
    ColumnSpec {
        field: "document_ref",
        aliases: &["po ref no.", "po ref no", "po number", "po no.", "po no"],
        fallback: 3,
    },
    ColumnSpec {
        field: "quantity",
        aliases: &["qty", "quantity", "po qty", "order qty"],
        fallback: 4,
    },
    ColumnSpec {
        field: "tax",
        aliases: &["tax", "tax amount", "gst amount", "total tax"],
        fallback: 10,
    },
    ColumnSpec {
        field: "total",
        aliases: &["total", "total amount", "total value", "amount"],
        fallback: 11,
    },
];

/// 各字段对应的列下标，顺序同 `COLUMNS`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMap {
    pub material_code: usize,
    pub description: usize,
    pub document_ref: usize,
    pub quantity: usize,
    pub tax: usize,
    pub total: usize,
}

impl ColumnMap {
    pub fn resolve(source_name: &str, header: &[String], width: usize) -> Result<Self, LoadError> {
        let names: Vec<String> = header.iter().map(|h| h.trim().to_lowercase()).collect();

        let mut resolved = [0usize; 6];
        for (slot, spec) in resolved.iter_mut().zip(COLUMNS.iter()) {
            if let Some(idx) = names.iter().position(|n| spec.aliases.contains(&n.as_str())) {
                *slot = idx;
            } else if spec.fallback < width {
                tracing::warn!(
                    "{}: column '{}' not found by header name, falling back to position {}",
                    source_name, spec.field, spec.fallback
                );
                *slot = spec.fallback;
            } else {
                return Err(LoadError::UnresolvedColumn {
                    source_name: source_name.to_string(),
                    field: spec.field,
                });
            }
        }

        let [material_code, description, document_ref, quantity, tax, total] = resolved;
        Ok(Self {
            material_code,
            description,
            document_ref,
            quantity,
            tax,
            total,
        })
    }
}

/// 第一行任一单元格包含标记文字即为表头
pub fn find_header_row(grid: &Grid, marker: &str) -> Option<usize> {
    grid.iter()
        .position(|row| row.iter().any(|cell| cell.contains(marker)))
}

/// 去掉供应商前缀 (如 `CR-`、`WO-`) 后规范化
pub fn clean_code(raw: &str, strip_prefixes: &[String]) -> String {
    let mut code = raw.to_string();
    for prefix in strip_prefixes {
        code = code.replace(prefix.as_str(), "");
    }
    normalize(&code)
}

pub fn load_rows(
    source_name: &str,
    grid: &Grid,
    options: &LoaderOptions,
) -> Result<Vec<LineItem>, LoadError> {
    let Some(header_idx) = find_header_row(grid, &options.header_marker) else {
        return Err(LoadError::MissingHeader {
            source_name: source_name.to_string(),
            marker: options.header_marker.clone(),
        });
    };

    let width = grid[header_idx..].iter().map(Vec::len).max().unwrap_or(0);
    let columns = ColumnMap::resolve(source_name, &grid[header_idx], width)?;

    let cell = |row: &[String], idx: usize| -> String {
        row.get(idx).map(|s| s.trim().to_string()).unwrap_or_default()
    };

    let mut items = Vec::new();
    let mut dropped = 0usize;
    for row in &grid[header_idx + 1..] {
        let code = clean_code(&cell(row, columns.material_code), &options.strip_prefixes);
        if EMPTY_CODE_SENTINELS.contains(&code.as_str()) {
            dropped += 1;
            continue;
        }

        let item = LineItem::from_total(
            code,
            cell(row, columns.description),
            parse_amount(&cell(row, columns.quantity)),
            parse_amount(&cell(row, columns.total)),
            parse_amount(&cell(row, columns.tax)),
        )
        .with_document_ref(cell(row, columns.document_ref));
        items.push(item);
    }

    tracing::info!(
        "{}: header at row {}, loaded {} reference rows ({} dropped)",
        source_name,
        header_idx + 1,
        items.len(),
        dropped
    );

    Ok(items)
}
