//! Application configuration.

use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use super::args::CliArgs;
use crate::application::services::{
    DEFAULT_CACHE_CAPACITY, DEFAULT_JPEG_QUALITY, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_DELAY,
    DEFAULT_MAX_DIMENSION, DEFAULT_MIN_DELAY, PreprocessConfig, RetryPolicy,
};
use crate::application::use_cases::AnalysisConfig;
use crate::infrastructure::cache::DEFAULT_MAX_DISK_BYTES;
use crate::infrastructure::gemini::{
    DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS, GEMINI_API_BASE, GeminiConfig,
};

const APP_NAME: &str = "clarity";
const APP_QUALIFIER: &str = "dev";
const APP_ORGANIZATION: &str = "clarity";

/// Platform directories for the application.
pub(crate) fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
}

/// Log level configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warning level.
    Warn,
    /// Error level.
    Error,
}

impl LogLevel {
    /// Converts to tracing level.
    #[must_use]
    pub const fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trace => write!(f, "trace"),
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Application configuration, read from `config.toml` and overridden by CLI
/// flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Configuration file path.
    #[serde(skip)]
    pub config: Option<PathBuf>,

    /// Log file path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Also log to stderr.
    #[serde(skip)]
    pub log_stderr: bool,

    /// Vision model settings.
    #[serde(default)]
    pub model: ModelConfig,

    /// Image normalization settings.
    #[serde(default)]
    pub image: ImageConfig,

    /// Response cache settings.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Retry settings.
    #[serde(default)]
    pub retry: RetryConfig,
}

/// Vision model configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model identifier.
    #[serde(default = "default_model_name")]
    pub name: String,

    /// REST endpoint base.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: default_model_name(),
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Image normalization configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageConfig {
    /// Longest side after resizing, in pixels.
    #[serde(default = "default_max_dimension")]
    pub max_dimension: u32,

    /// JPEG quality (1-100).
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            max_dimension: default_max_dimension(),
            jpeg_quality: default_jpeg_quality(),
        }
    }
}

/// Response cache configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Number of responses kept in memory.
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,

    /// Persist responses to disk across sessions.
    #[serde(default = "default_true")]
    pub persist: bool,

    /// Directory for persisted responses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,

    /// Disk budget for persisted responses, in bytes.
    #[serde(default = "default_max_disk_bytes")]
    pub max_disk_bytes: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_cache_capacity(),
            persist: true,
            dir: None,
            max_disk_bytes: default_max_disk_bytes(),
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Attempts per request, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Wait before the first retry, in seconds.
    #[serde(default = "default_min_delay_secs")]
    pub min_delay_secs: u64,

    /// Upper bound on any wait, in seconds.
    #[serde(default = "default_max_delay_secs")]
    pub max_delay_secs: u64,

    /// Retry two-image comparisons as well.
    #[serde(default)]
    pub retry_comparisons: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            min_delay_secs: default_min_delay_secs(),
            max_delay_secs: default_max_delay_secs(),
            retry_comparisons: false,
        }
    }
}

fn default_model_name() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_base_url() -> String {
    GEMINI_API_BASE.to_string()
}

const fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

const fn default_max_dimension() -> u32 {
    DEFAULT_MAX_DIMENSION
}

const fn default_jpeg_quality() -> u8 {
    DEFAULT_JPEG_QUALITY
}

const fn default_cache_capacity() -> usize {
    DEFAULT_CACHE_CAPACITY
}

const fn default_max_disk_bytes() -> u64 {
    DEFAULT_MAX_DISK_BYTES
}

const fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

const fn default_min_delay_secs() -> u64 {
    DEFAULT_MIN_DELAY.as_secs()
}

const fn default_max_delay_secs() -> u64 {
    DEFAULT_MAX_DELAY.as_secs()
}

const fn default_true() -> bool {
    true
}

impl AppConfig {
    /// Merges CLI arguments into the configuration.
    pub fn merge_with_args(&mut self, args: &CliArgs) {
        if let Some(config_path) = &args.config {
            self.config = Some(config_path.clone());
        }
        if let Some(log_path) = &args.log_path {
            self.log_path = Some(log_path.clone());
        }
        if let Some(log_level) = args.log_level {
            self.log_level = log_level;
        }
        if args.log_stderr {
            self.log_stderr = true;
        }
        if let Some(model) = &args.model {
            self.model.name.clone_from(model);
        }
        if let Some(base_url) = &args.base_url {
            self.model.base_url.clone_from(base_url);
        }
        if let Some(timeout) = args.timeout {
            self.model.timeout_secs = timeout;
        }
        if let Some(max_dimension) = args.max_dimension {
            self.image.max_dimension = max_dimension;
        }
        if let Some(jpeg_quality) = args.jpeg_quality {
            self.image.jpeg_quality = jpeg_quality;
        }
        if let Some(capacity) = args.cache_capacity {
            self.cache.capacity = capacity;
        }
        if args.no_persist {
            self.cache.persist = false;
        }
        if let Some(cache_dir) = &args.cache_dir {
            self.cache.dir = Some(cache_dir.clone());
        }
        if let Some(max_attempts) = args.max_attempts {
            self.retry.max_attempts = max_attempts;
        }
        if args.retry_comparisons {
            self.retry.retry_comparisons = true;
        }
    }

    /// Settings for the analysis pipeline.
    #[must_use]
    pub fn analysis_config(&self) -> AnalysisConfig {
        AnalysisConfig {
            preprocess: PreprocessConfig {
                max_dimension: self.image.max_dimension,
                jpeg_quality: self.image.jpeg_quality,
            },
            cache_capacity: self.cache.capacity,
            retry: RetryPolicy::new()
                .with_max_attempts(self.retry.max_attempts)
                .with_delays(
                    Duration::from_secs(self.retry.min_delay_secs),
                    Duration::from_secs(self.retry.max_delay_secs),
                ),
            retry_comparisons: self.retry.retry_comparisons,
        }
    }

    /// Settings for the Gemini client.
    #[must_use]
    pub fn gemini_config(&self) -> GeminiConfig {
        GeminiConfig {
            model: self.model.name.clone(),
            base_url: self.model.base_url.clone(),
            timeout_secs: self.model.timeout_secs,
        }
    }

    /// Returns default config directory.
    #[must_use]
    pub fn default_config_dir() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Returns default config file path.
    #[must_use]
    pub fn default_config_path() -> Option<PathBuf> {
        Self::default_config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Returns default log file path.
    #[must_use]
    pub fn default_log_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.data_dir().join("clarity.log"))
    }

    /// Returns effective config path.
    #[must_use]
    pub fn effective_config_path(&self) -> Option<PathBuf> {
        self.config.clone().or_else(Self::default_config_path)
    }

    /// Returns effective log path.
    #[must_use]
    pub fn effective_log_path(&self) -> Option<PathBuf> {
        self.log_path.clone().or_else(Self::default_log_path)
    }

    /// Returns effective directory for persisted responses.
    #[must_use]
    pub fn effective_cache_dir(&self) -> Option<PathBuf> {
        self.cache
            .dir
            .clone()
            .or_else(crate::infrastructure::cache::default_cache_dir)
    }

    /// Returns the persisted-response directory for the configured model,
    /// one subdirectory per model name.
    #[must_use]
    pub fn model_cache_dir(&self) -> Option<PathBuf> {
        let model: String = self
            .model
            .name
            .trim()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.effective_cache_dir().map(|dir| dir.join(model))
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config: None,
            log_path: None,
            log_level: LogLevel::Info,
            log_stderr: false,
            model: ModelConfig::default(),
            image: ImageConfig::default(),
            cache: CacheConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_parse_partial_config() {
        let toml_content = r#"
            log_level = "debug"

            [model]
            name = "gemini-1.5-pro"

            [image]
            max_dimension = 1024

            [retry]
            max_attempts = 5
            retry_comparisons = true
        "#;

        let config: AppConfig = toml::from_str(toml_content).expect("Failed to parse config");

        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.model.name, "gemini-1.5-pro");
        assert_eq!(config.model.base_url, GEMINI_API_BASE);
        assert_eq!(config.image.max_dimension, 1024);
        assert_eq!(config.image.jpeg_quality, DEFAULT_JPEG_QUALITY);
        assert_eq!(config.cache, CacheConfig::default());
        assert_eq!(config.retry.max_attempts, 5);
        assert!(config.retry.retry_comparisons);
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();

        assert_eq!(config.model.name, DEFAULT_MODEL);
        assert_eq!(config.cache.capacity, 100);
        assert!(config.cache.persist);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.min_delay_secs, 4);
        assert_eq!(config.retry.max_delay_secs, 10);
        assert!(!config.retry.retry_comparisons);
    }

    #[test]
    fn test_default_config_round_trips_through_toml() {
        let serialized = toml::to_string_pretty(&AppConfig::default()).unwrap();
        let parsed: AppConfig = toml::from_str(&serialized).unwrap();

        assert_eq!(parsed.model, ModelConfig::default());
        assert_eq!(parsed.retry, RetryConfig::default());
    }

    #[test]
    fn test_analysis_config_mapping() {
        let mut config = AppConfig::default();
        config.retry.min_delay_secs = 1;
        config.retry.max_delay_secs = 2;
        config.cache.capacity = 7;

        let analysis = config.analysis_config();

        assert_eq!(analysis.cache_capacity, 7);
        assert_eq!(analysis.retry.min_delay, Duration::from_secs(1));
        assert_eq!(analysis.retry.max_delay, Duration::from_secs(2));
        assert_eq!(analysis.preprocess, PreprocessConfig::default());
        assert!(!analysis.retry_comparisons);
    }

    #[test]
    fn test_model_cache_dir_is_per_model() {
        let mut config = AppConfig::default();
        config.cache.dir = Some(PathBuf::from("/tmp/clarity-cache"));

        config.model.name = "gemini-1.5-flash".to_string();
        let flash = config.model_cache_dir().unwrap();
        config.model.name = "models/gemini-1.5-pro".to_string();
        let pro = config.model_cache_dir().unwrap();

        assert_eq!(flash, PathBuf::from("/tmp/clarity-cache/gemini-1.5-flash"));
        assert_eq!(pro, PathBuf::from("/tmp/clarity-cache/models_gemini-1.5-pro"));
    }

    #[test]
    fn test_merge_with_args_overrides() {
        let args = CliArgs::parse_from([
            "clarity",
            "--model",
            "gemini-2.0-flash",
            "--max-attempts",
            "1",
            "--no-persist",
            "--log-level",
            "warn",
            "presets",
        ]);
        let mut config = AppConfig::default();

        config.merge_with_args(&args);

        assert_eq!(config.model.name, "gemini-2.0-flash");
        assert_eq!(config.retry.max_attempts, 1);
        assert!(!config.cache.persist);
        assert_eq!(config.log_level, LogLevel::Warn);
        assert_eq!(config.image, ImageConfig::default());
    }
}
