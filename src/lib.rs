pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod loader;
pub mod models;
pub mod service;

pub use config::AppConfig;
pub use db::{connect_optional, create_pool};
pub use error::{AppError, LoadError, SettingsError};
pub use service::{reconcile, reconcile_batch, ReconciliationEngine, ToolRegistry};
