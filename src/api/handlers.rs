use crate::config::AppConfig;
use crate::db::{persist_report, PersistOutcome, ReportRecord};
use crate::error::AppError;
use crate::models::{DocumentSummary, LineItem};
use crate::service::registry::ToolInfo;
use crate::service::{
    reconcile_batch as run_batch, Reconciliation, ReconcileJob, ReconciliationEngine,
    RunContext, ToolInput, ToolOutput, ToolRegistry,
};
use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::Arc;

/// 共享状态：工具注册表 + 可选的持久化连接池
pub struct AppState {
    pub registry: Arc<ToolRegistry>,
    pub pool: Option<PgPool>,
    pub config: Arc<AppConfig>,
}

/// 请求体: 已规范化的明细行直接对账
#[derive(Debug, Deserialize)]
pub struct ReconcileRequest {
    pub reference_items: Vec<LineItem>,
    pub candidate_items: Vec<LineItem>,
    pub document: DocumentSummary,
    #[serde(default)]
    pub tolerance: Option<BigDecimal>,
    #[serde(default)]
    pub max_edits: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct BatchReconcileRequest {
    pub jobs: Vec<ReconcileJob>,
}

/// 错误响应体
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ReconcileResponse {
    pub success: bool,
    pub message: String,
    pub reconciliation: Reconciliation,
}

#[derive(Debug, Serialize)]
pub struct BatchReconcileResponse {
    pub success: bool,
    pub message: String,
    pub results: Vec<Reconciliation>,
}

#[derive(Debug, Serialize)]
pub struct ToolRunResponse {
    pub success: bool,
    pub message: String,
    pub output: ToolOutput,
    pub persistence: PersistOutcome,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Load(_) | AppError::InvalidSettings(_) => StatusCode::BAD_REQUEST,
            AppError::UnknownTool(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let response = ErrorResponse {
            success: false,
            message: format!("Error: {}", self),
        };
        (status, Json(response)).into_response()
    }
}

fn join_failed(e: tokio::task::JoinError) -> Response {
    tracing::error!("reconciliation task failed: {:?}", e);
    let response = ErrorResponse {
        success: false,
        message: format!("Error: {}", e),
    };
    (StatusCode::INTERNAL_SERVER_ERROR, Json(response)).into_response()
}

/// 健康检查
pub async fn health_check() -> &'static str {
    "OK"
}

/// 已注册的对账工具
pub async fn list_tools(State(state): State<Arc<AppState>>) -> Json<Vec<ToolInfo>> {
    Json(state.registry.list())
}

/// 运行指定工具并尽力保存报告
pub async fn run_tool(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    Json(input): Json<ToolInput>,
) -> Response {
    let ctx = RunContext::new(
        &key,
        state.config.recon.match_settings(),
        state.config.recon.header_marker.clone(),
    );

    let registry = state.registry.clone();
    let tool_key = key.clone();
    let run_ctx = ctx.clone();
    // 表格解析和比对是 CPU 密集型，不占用异步线程
    let result = tokio::task::spawn_blocking(move || registry.run(&tool_key, &run_ctx, input)).await;

    let output = match result {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            tracing::warn!("[{}] run {} failed: {}", key, ctx.run_id, e);
            return e.into_response();
        }
        Err(e) => return join_failed(e),
    };

    let record = ReportRecord::from_output("reconciliation", &output, ctx.started_at);
    let persistence = persist_report(state.pool.as_ref(), &record).await;

    let response = ToolRunResponse {
        success: true,
        message: format!(
            "{} rows reconciled, accuracy {:.2}%",
            output.table.len(),
            output.reconciliation.summary.accuracy_pct
        ),
        output,
        persistence,
    };
    (StatusCode::OK, Json(response)).into_response()
}

/// 单组对账
pub async fn reconcile(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ReconcileRequest>,
) -> Response {
    let settings = match state
        .config
        .recon
        .match_settings()
        .with_overrides(req.tolerance.clone(), req.max_edits)
    {
        Ok(settings) => settings,
        Err(e) => return AppError::from(e).into_response(),
    };

    let result = tokio::task::spawn_blocking(move || {
        ReconciliationEngine::new(settings).reconcile(
            &req.reference_items,
            &req.candidate_items,
            &req.document,
        )
    })
    .await;

    let reconciliation = match result {
        Ok(reconciliation) => reconciliation,
        Err(e) => return join_failed(e),
    };

    let response = ReconcileResponse {
        success: true,
        message: format!(
            "Reconciled {} rows, accuracy {:.2}%",
            reconciliation.report.len(),
            reconciliation.summary.accuracy_pct
        ),
        reconciliation,
    };
    (StatusCode::OK, Json(response)).into_response()
}

/// 批量对账
pub async fn reconcile_batch(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BatchReconcileRequest>,
) -> Response {
    let defaults = state.config.recon.match_settings();
    let job_count = req.jobs.len();

    let results = match tokio::task::spawn_blocking(move || run_batch(&req.jobs, &defaults)).await {
        Ok(results) => results,
        Err(e) => return join_failed(e),
    };

    let response = BatchReconcileResponse {
        success: true,
        message: format!("Successfully reconciled {} jobs", job_count),
        results,
    };
    (StatusCode::OK, Json(response)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LoadError;

    #[test]
    fn errors_map_to_status_codes() {
        let load = AppError::Load(LoadError::UnsupportedFormat {
            source_name: "po.pdf".to_string(),
        });
        assert_eq!(load.into_response().status(), StatusCode::BAD_REQUEST);

        let unknown = AppError::UnknownTool("nope".to_string());
        assert_eq!(unknown.into_response().status(), StatusCode::NOT_FOUND);

        let io = AppError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        assert_eq!(io.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn reconcile_handler_applies_request_tolerance() {
        use std::str::FromStr;
        let dec = |s: &str| BigDecimal::from_str(s).unwrap();

        let state = Arc::new(AppState {
            registry: Arc::new(ToolRegistry::builtin()),
            pool: None,
            config: Arc::new(AppConfig::default()),
        });
        let req = ReconcileRequest {
            reference_items: vec![LineItem::from_total("AB1", "", dec("1"), dec("110"), dec("10"))],
            candidate_items: vec![LineItem::new("AB1", "fan", dec("1"), dec("100"), dec("0"))],
            document: DocumentSummary::from_totals(None, dec("100"), dec("110"), dec("10")),
            tolerance: Some(dec("0")),
            max_edits: None,
        };

        let response = reconcile(State(state), Json(req)).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn negative_request_tolerance_is_bad_request() {
        use std::str::FromStr;
        let dec = |s: &str| BigDecimal::from_str(s).unwrap();

        let state = Arc::new(AppState {
            registry: Arc::new(ToolRegistry::builtin()),
            pool: None,
            config: Arc::new(AppConfig::default()),
        });
        let req = ReconcileRequest {
            reference_items: vec![LineItem::from_total("AB1", "", dec("1"), dec("100"), dec("0"))],
            candidate_items: vec![LineItem::new("AB1", "fan", dec("1"), dec("100"), dec("0"))],
            document: DocumentSummary::from_totals(None, dec("100"), dec("100"), dec("0")),
            tolerance: Some(dec("-1")),
            max_edits: None,
        };

        let response = reconcile(State(state), Json(req)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
