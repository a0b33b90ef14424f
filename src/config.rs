use bigdecimal::{BigDecimal, Zero};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use crate::loader::LoaderOptions;
use crate::service::MatchSettings;

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub recon: ReconConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// 未配置时不做持久化
    #[serde(default)]
    pub url: Option<String>,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconConfig {
    /// 金额容差 (货币单位)，常用范围 0–20
    pub tolerance: BigDecimal,
    pub max_edits: usize,
    /// 参考表格表头行的标记文字
    pub header_marker: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL").ok(),
                max_connections: 5,
            },
            recon: ReconConfig {
                tolerance: BigDecimal::from(7),
                max_edits: 1,
                header_marker: "SKU".to_string(),
            },
        }
    }
}

impl AppConfig {
    /// 默认值 → `invoice-recon.toml` (可选) → `RECON__*` 环境变量 → 旧变量
    /// `SERVER_HOST` / `SERVER_PORT` / `DATABASE_URL`
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("database.max_connections", 5)?
            .set_default("recon.tolerance", "7.0")?
            .set_default("recon.max_edits", 1)?
            .set_default("recon.header_marker", "SKU")?
            .add_source(File::with_name("invoice-recon").required(false))
            .add_source(
                Environment::with_prefix("RECON")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("server.host", std::env::var("SERVER_HOST").ok())?
            .set_override_option("server.port", std::env::var("SERVER_PORT").ok())?
            .set_override_option("database.url", std::env::var("DATABASE_URL").ok())?
            .build()?;

        let app: AppConfig = config.try_deserialize()?;
        app.validate()?;
        Ok(app)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.recon.tolerance < BigDecimal::zero() {
            return Err(ConfigError::Message(format!(
                "recon.tolerance must not be negative (got {})",
                self.recon.tolerance
            )));
        }
        if self.recon.tolerance > BigDecimal::from(20) {
            tracing::warn!(
                "recon.tolerance {} is above the usual 0-20 range",
                self.recon.tolerance
            );
        }
        if self.recon.header_marker.trim().is_empty() {
            return Err(ConfigError::Message("recon.header_marker must not be empty".to_string()));
        }
        Ok(())
    }
}

impl ReconConfig {
    pub fn match_settings(&self) -> MatchSettings {
        MatchSettings {
            tolerance: self.tolerance.clone(),
            max_edits: self.max_edits,
        }
    }

    pub fn loader_options(&self) -> LoaderOptions {
        LoaderOptions {
            header_marker: self.header_marker.clone(),
            ..Default::default()
        }
    }
}
