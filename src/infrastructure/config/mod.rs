//! Application configuration.

pub mod app_config;
pub mod args;
pub mod storage;

pub(crate) use app_config::project_dirs;
pub use app_config::{AppConfig, CacheConfig, ImageConfig, LogLevel, ModelConfig, RetryConfig};
pub use args::{CacheCommand, CliArgs, Command};
pub use storage::{ConfigError, StorageManager};
