//! 表格文件读取为字符串网格
//!
//! Excel / ODS 用 calamine，CSV 用 csv；只读第一个工作表。

use calamine::{open_workbook_auto, Data, Reader, Sheets};
use std::path::Path;

use crate::error::LoadError;

pub type Grid = Vec<Vec<String>>;

pub fn read_grid(path: &Path) -> Result<Grid, LoadError> {
    let source_name = path.display().to_string();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "csv" => read_csv(path, &source_name),
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => read_workbook(path, &source_name),
        _ => Err(LoadError::UnsupportedFormat { source_name }),
    }
}

fn read_csv(path: &Path, source_name: &str) -> Result<Grid, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|e| unreadable(source_name, e))?;

    let mut grid = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| unreadable(source_name, e))?;
        grid.push(record.iter().map(|s| s.to_string()).collect());
    }
    Ok(grid)
}

fn read_workbook(path: &Path, source_name: &str) -> Result<Grid, LoadError> {
    let mut workbook: Sheets<_> =
        open_workbook_auto(path).map_err(|e| unreadable(source_name, e))?;

    let Some(first_sheet) = workbook.sheet_names().first().cloned() else {
        return Err(LoadError::Unreadable {
            source_name: source_name.to_string(),
            reason: "workbook contains no sheets".to_string(),
        });
    };

    let range = workbook
        .worksheet_range(&first_sheet)
        .map_err(|e| unreadable(source_name, e))?;

    Ok(range
        .rows()
        .map(|row| row.iter().map(cell_text).collect())
        .collect())
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        // 整数不带小数位
        Data::Float(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
        Data::Float(n) => format!("{}", n),
        Data::Int(n) => format!("{}", n),
        Data::Bool(b) => (if *b { "TRUE" } else { "FALSE" }).to_string(),
        Data::Error(e) => format!("#{:?}", e),
        Data::DateTime(dt) => format!("{}", dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
    }
}

fn unreadable(source_name: &str, e: impl std::fmt::Display) -> LoadError {
    LoadError::Unreadable {
        source_name: source_name.to_string(),
        reason: e.to_string(),
    }
}
