//! Infrastructure layer with external service adapters.

/// Persistent response cache.
pub mod cache;
/// Application configuration.
pub mod config;
/// Google Gemini vision model client.
pub mod gemini;

pub use cache::DiskResponseCache;
pub use config::{AppConfig, CliArgs, Command, LogLevel, StorageManager};
pub use gemini::{GeminiClient, GeminiConfig};
