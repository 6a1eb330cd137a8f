use super::app_config::{AppConfig, project_dirs};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

const CONFIG_FILE_NAME: &str = "config.toml";

/// Configuration storage errors.
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum ConfigError {
    #[error("failed to determine config directory")]
    ConfigDirNotFound,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("toml serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

/// Reads and writes `config.toml`.
pub struct StorageManager {
    config_dir: PathBuf,
}

impl StorageManager {
    /// Create a new `StorageManager`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the configuration directory cannot be determined.
    pub fn new() -> Result<Self, ConfigError> {
        let config_dir = project_dirs()
            .map(|dirs| dirs.config_dir().to_path_buf())
            .ok_or(ConfigError::ConfigDirNotFound)?;

        Ok(Self { config_dir })
    }

    /// Creates a new `StorageManager` with a specific directory (useful for testing).
    #[must_use]
    pub fn with_dir(path: PathBuf) -> Self {
        Self { config_dir: path }
    }

    /// Returns the configuration directory path.
    #[must_use]
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Ensures the configuration directory exists.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the directory cannot be created.
    pub fn ensure_config_dir(&self) -> Result<(), ConfigError> {
        if !self.config_dir.exists() {
            info!(path = %self.config_dir.display(), "Creating configuration directory");
            fs::create_dir_all(&self.config_dir)?;
        }
        Ok(())
    }

    /// Path of the default configuration file.
    #[must_use]
    pub fn config_path(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE_NAME)
    }

    /// Loads the application configuration.
    ///
    /// A missing default file is created with default values. An explicit
    /// `path_override` is never created. Unparseable files fall back to
    /// defaults and are left untouched.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be read or the default cannot
    /// be written.
    pub fn load_config(&self, path_override: Option<&Path>) -> Result<AppConfig, ConfigError> {
        let mut config = match path_override {
            Some(path) if !path.exists() => {
                warn!(path = %path.display(), "Config file not found, using defaults");
                AppConfig::default()
            }
            Some(path) => Self::read_config(path)?,
            None => {
                let path = self.config_path();
                if path.exists() {
                    Self::read_config(&path)?
                } else {
                    info!(path = %path.display(), "Config file not found, creating default");
                    let default_config = AppConfig::default();
                    self.save_config(&default_config)?;
                    default_config
                }
            }
        };

        config.config = Some(path_override.map_or_else(|| self.config_path(), Path::to_path_buf));
        Ok(config)
    }

    fn read_config(path: &Path) -> Result<AppConfig, ConfigError> {
        let content = fs::read_to_string(path)?;
        match toml::from_str::<AppConfig>(&content) {
            Ok(config) => {
                debug!(path = %path.display(), "Loaded config file");
                Ok(config)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to parse config file, using defaults");
                Ok(AppConfig::default())
            }
        }
    }

    /// Writes the configuration to its default location.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be written.
    pub fn save_config(&self, config: &AppConfig) -> Result<(), ConfigError> {
        self.ensure_config_dir()?;
        Self::save_to_file(&self.config_dir.join(CONFIG_FILE_NAME), config)
    }

    fn save_to_file<T: serde::Serialize>(path: &Path, data: &T) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(data)?;

        let parent = path
            .parent()
            .ok_or_else(|| std::io::Error::other("Invalid path"))?;
        let mut temp_file = tempfile::NamedTempFile::new_in(parent)?;
        temp_file.write_all(content.as_bytes())?;
        temp_file.persist(path).map_err(|e| e.error)?;

        Ok(())
    }
}
