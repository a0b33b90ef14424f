use thiserror::Error;

/// 数据源无法解析，整次对账失败
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("{source_name}: no header row containing '{marker}' found")]
    MissingHeader { source_name: String, marker: String },

    #[error("{source_name}: column for '{field}' could not be resolved by name or position")]
    UnresolvedColumn { source_name: String, field: &'static str },

    #[error("{source_name}: unreadable ({reason})")]
    Unreadable { source_name: String, reason: String },

    #[error("{source_name}: unsupported file format")]
    UnsupportedFormat { source_name: String },

    #[error("{source_name}: cannot be loaded as {expected} data")]
    KindMismatch { source_name: String, expected: &'static str },
}

impl LoadError {
    pub fn source_name(&self) -> &str {
        match self {
            LoadError::MissingHeader { source_name, .. }
            | LoadError::UnresolvedColumn { source_name, .. }
            | LoadError::Unreadable { source_name, .. }
            | LoadError::UnsupportedFormat { source_name }
            | LoadError::KindMismatch { source_name, .. } => source_name,
        }
    }
}

/// 比对参数不合法
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SettingsError {
    #[error("tolerance must not be negative (got {0})")]
    NegativeTolerance(bigdecimal::BigDecimal),
}

/// 服务层错误
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    InvalidSettings(#[from] SettingsError),

    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("export error: {0}")]
    Export(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;
