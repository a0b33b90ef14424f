use axum::{routing::{get, post}, Router};
use invoice_recon::api::{self, AppState};
use invoice_recon::{connect_optional, AppConfig, ToolRegistry};
use std::sync::Arc;
use tower::ServiceBuilder;
use tracing::info;
use tracing_subscriber::fmt::time::ChronoLocal;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 初始化日志 - 使用本地时间格式
    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_target(true)
        .with_level(true)
        .init();

    // 加载配置
    let config = AppConfig::from_env()?;
    info!("Starting server with config: {:?}", config);

    // 数据库可选，连不上也照常提供对账
    let pool = connect_optional(&config.database).await;
    if pool.is_some() {
        info!("Database pool created");
    }

    let registry = Arc::new(ToolRegistry::builtin());
    let tool_keys: Vec<String> = registry.list().into_iter().map(|t| t.key).collect();

    let state = Arc::new(AppState {
        registry,
        pool,
        config: Arc::new(config.clone()),
    });

    // 构建路由
    let app = Router::new()
        .route("/health", get(api::health_check))
        .route("/api/tools", get(api::list_tools))
        .route("/api/tools/:key/run", post(api::run_tool))
        .route("/api/reconcile", post(api::reconcile))
        .route("/api/reconcile/batch", post(api::reconcile_batch))
        .with_state(state)
        .layer(ServiceBuilder::new());

    // 启动服务器
    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Server listening on {}", addr);
    info!("API Endpoints:");
    info!("  GET  /api/tools             - registered tools: {}", tool_keys.join(", "));
    info!("  POST /api/tools/:key/run    - run a vendor tool");
    info!("  POST /api/reconcile         - reconcile normalized line items");
    info!("  POST /api/reconcile/batch   - reconcile many jobs in parallel");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
