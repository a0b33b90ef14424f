use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sqlx::types::Json;
use sqlx::PgPool;
use std::time::Duration;

use crate::service::ToolOutput;

/// 对账报告表 (每次运行一行)
#[derive(Debug, Clone, Serialize)]
pub struct ReportRecord {
    pub module_name: String,
    pub tool: String,
    pub run_id: String,
    pub invoice_no: String,
    pub accuracy_pct: f64,
    pub summary: Value,
    pub line_items: Value,
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
}

impl ReportRecord {
    /// 元数据记录本次实际生效的比对参数
    pub fn from_output(module_name: &str, output: &ToolOutput, started_at: DateTime<Utc>) -> Self {
        let metadata = serde_json::json!({
            "started_at": started_at,
            "tolerance": output.settings.tolerance.to_string(),
            "max_edits": output.settings.max_edits,
        });
        Self {
            module_name: module_name.to_string(),
            tool: output.tool.clone(),
            run_id: output.run_id.clone(),
            invoice_no: output.invoice_no.clone(),
            accuracy_pct: output.reconciliation.summary.accuracy_pct,
            summary: serde_json::to_value(&output.summary_table).unwrap_or(Value::Null),
            line_items: serde_json::to_value(&output.table).unwrap_or(Value::Null),
            metadata,
            created_at: Utc::now(),
        }
    }
}

/// 持久化结果；失败只记录，不影响对账结果
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PersistOutcome {
    Persisted { id: i64 },
    PersistFailed { reason: String },
}

/// 建表 (幂等)
pub async fn ensure_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS t_recon_report (
            fid BIGSERIAL PRIMARY KEY,
            fmodule TEXT NOT NULL,
            ftool TEXT NOT NULL,
            frunid TEXT NOT NULL,
            finvoiceno TEXT NOT NULL,
            faccuracy DOUBLE PRECISION NOT NULL,
            fsummary JSONB NOT NULL,
            flineitems JSONB NOT NULL,
            fmetadata JSONB NOT NULL,
            fcreatetime TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// 插入一次运行的报告，返回新行 ID
pub async fn insert_report(pool: &PgPool, record: &ReportRecord) -> Result<i64, sqlx::Error> {
    let start_time = std::time::Instant::now();

    let insert = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO t_recon_report (
            fmodule, ftool, frunid, finvoiceno, faccuracy,
            fsummary, flineitems, fmetadata, fcreatetime
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING fid
        "#,
    )
    .bind(&record.module_name)
    .bind(&record.tool)
    .bind(&record.run_id)
    .bind(&record.invoice_no)
    .bind(record.accuracy_pct)
    .bind(Json(&record.summary))
    .bind(Json(&record.line_items))
    .bind(Json(&record.metadata))
    .bind(record.created_at)
    .fetch_one(pool);

    // 添加超时控制: 30秒
    match tokio::time::timeout(Duration::from_secs(30), insert).await {
        Ok(Ok(id)) => {
            tracing::info!("✓ report {} saved as {}, 耗时: {:?}", record.run_id, id, start_time.elapsed());
            Ok(id)
        }
        Ok(Err(e)) => {
            tracing::error!("✗ INSERT执行失败, 耗时: {:?}, 错误: {:?}", start_time.elapsed(), e);
            Err(e)
        }
        Err(_) => {
            tracing::error!("✗ INSERT操作超时 (>30秒)!");
            Err(sqlx::Error::PoolTimedOut)
        }
    }
}

/// 尽力而为的持久化
pub async fn persist_report(pool: Option<&PgPool>, record: &ReportRecord) -> PersistOutcome {
    let Some(pool) = pool else {
        tracing::debug!("persistence disabled, report {} not saved", record.run_id);
        return PersistOutcome::PersistFailed {
            reason: "database not configured".to_string(),
        };
    };

    match insert_report(pool, record).await {
        Ok(id) => PersistOutcome::Persisted { id },
        Err(e) => {
            tracing::warn!("report {} not persisted: {}", record.run_id, e);
            PersistOutcome::PersistFailed {
                reason: e.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> ReportRecord {
        ReportRecord {
            module_name: "reconciliation".to_string(),
            tool: "glen".to_string(),
            run_id: "glen-1".to_string(),
            invoice_no: "GL/1".to_string(),
            accuracy_pct: 50.0,
            summary: Value::Null,
            line_items: Value::Array(Vec::new()),
            metadata: Value::Null,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn missing_pool_is_a_failed_outcome_not_an_error() {
        let outcome = persist_report(None, &record()).await;
        assert!(matches!(outcome, PersistOutcome::PersistFailed { .. }));
    }

    #[test]
    fn metadata_records_applied_tolerance() {
        use crate::loader::Grid;
        use crate::models::ExtractedDocument;
        use crate::service::registry::ReferenceInput;
        use crate::service::{MatchSettings, RunContext, ToolInput, ToolRegistry};

        let rows: Grid = [
            ["SKU", "Description", "PO Ref No.", "Qty", "Tax", "Total"],
            ["CR-AB1", "fan", "PO-1", "1", "0", "100"],
        ]
        .iter()
        .map(|r| r.iter().map(|c| c.to_string()).collect())
        .collect();
        let input = ToolInput {
            reference: ReferenceInput::Rows { name: None, rows },
            candidate: ExtractedDocument::default(),
            tolerance: None,
        };
        let ctx = RunContext::new("crompton", MatchSettings::default(), "SKU");
        let output = ToolRegistry::builtin().run("crompton", &ctx, input).unwrap();

        let record = ReportRecord::from_output("reconciliation", &output, ctx.started_at);
        assert_eq!(record.metadata["tolerance"], "15");
        assert_eq!(record.metadata["max_edits"], 1);
    }

    #[test]
    fn outcome_serializes_with_status_tag() {
        let json = serde_json::to_value(PersistOutcome::Persisted { id: 9 }).unwrap();
        assert_eq!(json["status"], "persisted");
        assert_eq!(json["id"], 9);
    }
}
