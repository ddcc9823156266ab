use crate::completion::DEFAULT_EXCLUDED_KEYS;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Config {
    /// Editor behavior settings (deferred refresh timing)
    #[serde(default)]
    pub editor: EditorSettings,

    /// Autocompletion trigger settings
    #[serde(default)]
    pub completion: CompletionConfig,
}

/// Editor behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EditorSettings {
    /// How long in milliseconds to wait after the editor becomes visible
    /// before forcing a redraw. Layout is unreliable straight after an
    /// unhide, so the refresh settles first.
    #[serde(default = "default_refresh_settle_ms")]
    pub refresh_settle_ms: u64,
}

/// Autocompletion trigger configuration
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CompletionConfig {
    /// Key names that never trigger implicit completion (navigation and
    /// editing-control keys). Replaces the built-in set when present.
    #[serde(default = "default_excluded_keys")]
    pub excluded_keys: Vec<String>,
}

fn default_refresh_settle_ms() -> u64 {
    60
}

fn default_excluded_keys() -> Vec<String> {
    DEFAULT_EXCLUDED_KEYS
        .iter()
        .map(|name| name.to_string())
        .collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            editor: EditorSettings::default(),
            completion: CompletionConfig::default(),
        }
    }
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            refresh_settle_ms: default_refresh_settle_ms(),
        }
    }
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            excluded_keys: default_excluded_keys(),
        }
    }
}

impl Config {
    /// Get the default config file path
    pub fn default_config_path() -> Option<std::path::PathBuf> {
        dirs::config_dir().map(|d| d.join("flux-editor").join("config.json"))
    }

    /// Load configuration from the default location, falling back to
    /// defaults if not found
    pub fn load_or_default() -> Self {
        if let Some(config_path) = Self::default_config_path() {
            if config_path.exists() {
                match Self::load_from_file(&config_path) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!(
                            "Failed to load config from {}: {}, using defaults",
                            config_path.display(),
                            e
                        );
                    }
                }
            }
        }
        Self::default()
    }

    /// Load configuration from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        let config: Config =
            serde_json::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path.as_ref(), contents).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        // A multi-second settle would read as a hang
        if self.editor.refresh_settle_ms > 5000 {
            return Err(ConfigError::ValidationError(
                "refresh_settle_ms must be <= 5000".to_string(),
            ));
        }

        for key in &self.completion.excluded_keys {
            if key.is_empty() {
                return Err(ConfigError::ValidationError(
                    "excluded key name cannot be empty".to_string(),
                ));
            }
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
    ValidationError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(msg) => write!(f, "IO error: {msg}"),
            ConfigError::ParseError(msg) => write!(f, "Parse error: {msg}"),
            ConfigError::SerializeError(msg) => write!(f, "Serialize error: {msg}"),
            ConfigError::ValidationError(msg) => write!(f, "Validation error: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}
