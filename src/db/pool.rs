use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{ConnectOptions, PgPool};
use std::str::FromStr;
use std::time::Duration;

use crate::config::DatabaseConfig;

/// 创建数据库连接池
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    let mut connect_options = PgConnectOptions::from_str(database_url)?;

    // 设置慢查询日志阈值为 5秒
    connect_options = connect_options.log_slow_statements(
        tracing::log::LevelFilter::Warn,
        Duration::from_secs(5),
    );

    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(10))
        .connect_with(connect_options)
        .await
}

/// 持久化是可选的：未配置或连接失败都只告警，服务照常启动
pub async fn connect_optional(config: &DatabaseConfig) -> Option<PgPool> {
    let Some(url) = config.url.as_deref() else {
        tracing::warn!("database.url not set, reports will not be persisted");
        return None;
    };

    match create_pool(url, config.max_connections).await {
        Ok(pool) => {
            if let Err(e) = super::queries::ensure_schema(&pool).await {
                tracing::warn!("could not prepare report table: {}", e);
            }
            Some(pool)
        }
        Err(e) => {
            tracing::warn!("database unavailable ({}), reports will not be persisted", e);
            None
        }
    }
}
