//! Configuration loading, validation, and settings persistence.
//!
//! Two files live under `~/.impersonator/`:
//! - `config.toml`: how to reach the generation backend, where files go
//! - `settings.json`: the enabled flag, the active preset and all presets
//!   (see [`settings::PersistedSettings`])
//!
//! Environment variables override the backend credentials and model.

pub mod settings;

pub use settings::PersistedSettings;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.impersonator/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Where presets and the enabled flag are persisted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings_file: Option<PathBuf>,

    /// Default directory for preset and settings exports
    #[serde(default = "default_export_dir")]
    pub export_dir: PathBuf,

    /// Text generation backend
    #[serde(default)]
    pub generator: GeneratorConfig,
}

fn default_export_dir() -> PathBuf {
    PathBuf::from(".")
}

/// Connection settings for the generation backend.
#[derive(Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Backend kind; only "openai_compat" is built in
    #[serde(default = "default_provider")]
    pub provider: String,

    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_provider() -> String {
    "openai_compat".into()
}
fn default_api_url() -> String {
    "https://openrouter.ai/api/v1".into()
}
fn default_model() -> String {
    "anthropic/claude-sonnet-4".into()
}
fn default_temperature() -> f32 {
    0.9
}
fn default_timeout_secs() -> u64 {
    120
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            api_url: default_api_url(),
            api_key: None,
            model: default_model(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl std::fmt::Debug for GeneratorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneratorConfig")
            .field("provider", &self.provider)
            .field("api_url", &self.api_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.impersonator/config.toml).
    ///
    /// Also checks environment variables:
    /// - `IMPERSONATOR_API_KEY`, then `OPENAI_API_KEY` (only when the file sets no key)
    /// - `IMPERSONATOR_MODEL`
    /// - `IMPERSONATOR_API_URL`
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from(&Self::config_path())?;

        if config.generator.api_key.is_none() {
            config.generator.api_key = std::env::var("IMPERSONATOR_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENAI_API_KEY").ok());
        }

        if let Ok(model) = std::env::var("IMPERSONATOR_MODEL") {
            config.generator.model = model;
        }

        if let Ok(url) = std::env::var("IMPERSONATOR_API_URL") {
            config.generator.api_url = url;
        }

        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".impersonator")
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// The settings file in effect: configured path or the default location.
    pub fn settings_path(&self) -> PathBuf {
        self.settings_file
            .clone()
            .unwrap_or_else(|| Self::config_dir().join("settings.json"))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.generator.temperature) {
            return Err(ConfigError::ValidationError(
                "generator.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.generator.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "generator.timeout_secs must be > 0".into(),
            ));
        }

        if self.generator.api_url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "generator.api_url must not be empty".into(),
            ));
        }

        Ok(())
    }

    /// Generate a default config TOML string (for `config init`).
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            settings_file: None,
            export_dir: default_export_dir(),
            generator: GeneratorConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Failed to write {path}: {reason}")]
    WriteError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigError> for impersonator_core::Error {
    fn from(err: ConfigError) -> Self {
        impersonator_core::Error::Config {
            message: err.to_string(),
        }
    }
}
