//! Framework configuration, loaded from TOML or JSON.

mod component;

pub use component::{ComponentConfig, ConfigMediator};

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use store::EngineKind;

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameworkConfig {
    pub agent: AgentSettings,
    pub storage: StorageSettings,
    pub logging: LoggingConfig,
    /// Per-plugin settings, seeding the configuration mediator.
    pub components: Vec<ComponentConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    pub name: String,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            name: "tether".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Directory holding topic tables and plugin data files.
    pub root: PathBuf,
    pub engine: EngineKind,
    /// Directory for per-topic log files; relative paths resolve against `root`.
    pub log_dir: PathBuf,
}

impl StorageSettings {
    pub fn resolved_log_dir(&self) -> PathBuf {
        if self.log_dir.is_absolute() {
            self.log_dir.clone()
        } else {
            self.root.join(&self.log_dir)
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            root: PathBuf::from("storage"),
            engine: EngineKind::File,
            log_dir: PathBuf::from("logs"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`.
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl FrameworkConfig {
    /// Load configuration from file with format detection
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileNotFound(format!("{}: {}", path.display(), e)))?;

        let format = ConfigFormat::from_extension(path);
        let config: FrameworkConfig = match format {
            ConfigFormat::Json => serde_json::from_str(&content)
                .map_err(|e| ConfigError::ParseFailed(format!("JSON parse error: {}", e)))?,
            ConfigFormat::Toml => toml::from_str(&content)
                .map_err(|e| ConfigError::ParseFailed(format!("TOML parse error: {}", e)))?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let format = ConfigFormat::from_extension(path);

        let content = match format {
            ConfigFormat::Json => serde_json::to_string_pretty(self)
                .map_err(|e| ConfigError::ParseFailed(format!("JSON serialize error: {}", e)))?,
            ConfigFormat::Toml => toml::to_string_pretty(self)
                .map_err(|e| ConfigError::ParseFailed(format!("TOML serialize error: {}", e)))?,
        };

        store::write_atomic(path, content.as_bytes())
            .map_err(|e| ConfigError::WriteFailed(e.to_string()))?;

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.agent.name.trim().is_empty() {
            return Err(ConfigError::Invalid("Agent name cannot be empty".to_string()));
        }

        if self.storage.root.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("Storage root cannot be empty".to_string()));
        }

        if self.storage.log_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("Log directory cannot be empty".to_string()));
        }

        if self.logging.level.trim().is_empty() {
            return Err(ConfigError::Invalid("Log level cannot be empty".to_string()));
        }

        let mut seen = std::collections::HashSet::new();
        for component in &self.components {
            if component.name.trim().is_empty() {
                return Err(ConfigError::Invalid("Component name cannot be empty".to_string()));
            }
            if !seen.insert(component.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "Component '{}' is configured twice",
                    component.name
                )));
            }
            if !component.configs.is_object() {
                return Err(ConfigError::Invalid(format!(
                    "Configs of component '{}' must be a table",
                    component.name
                )));
            }
        }

        Ok(())
    }

    pub fn component(&self, name: &str) -> Option<&ComponentConfig> {
        self.components.iter().find(|c| c.name == name)
    }
}

/// Configuration file format detection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Toml,
}

impl ConfigFormat {
    pub fn from_extension(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::Json,
            _ => Self::Toml,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    #[error("Failed to write configuration: {0}")]
    WriteFailed(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Unknown component: {0}")]
    UnknownComponent(String),
}
