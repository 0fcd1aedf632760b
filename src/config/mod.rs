//! Application Configuration
//!
//! Engine settings and request defaults stored in TOML format.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::vision::{PreprocessingSelection, RecognitionLevel};

/// Application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Settings passed to the recognition engine
    pub recognition: RecognitionSettings,
    /// Defaults for request options the caller leaves out
    pub detection: DetectionDefaults,
    /// Logging settings
    pub logging: LoggingConfig,
}

/// Engine-level recognition settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionSettings {
    /// Minimum text height as a fraction of image height
    pub min_text_height: f32,
    /// Apply language-model correction
    pub language_correction: bool,
    /// Engine revision selector
    pub revision: String,
}

impl Default for RecognitionSettings {
    fn default() -> Self {
        Self {
            min_text_height: 0.05,
            language_correction: true,
            revision: "latest".to_string(),
        }
    }
}

/// Request option defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionDefaults {
    pub recognition_level: RecognitionLevel,
    pub enhance_for_brightness: bool,
    pub preprocessing_level: PreprocessingSelection,
    pub multi_pass: bool,
}

impl Default for DetectionDefaults {
    fn default() -> Self {
        Self {
            recognition_level: RecognitionLevel::Accurate,
            enhance_for_brightness: true,
            preprocessing_level: PreprocessingSelection::Auto,
            multi_pass: true,
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Get the configuration directory
pub fn config_dir() -> Result<PathBuf> {
    let proj_dirs = directories::ProjectDirs::from("com", "textdetector", "TextDetector")
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

    Ok(proj_dirs.config_dir().to_path_buf())
}

/// Default location of `config.toml`
pub fn default_config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {:?}", path))?;
    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config: {:?}", path))?;
    Ok(config)
}

/// Save configuration to file
pub fn save_config(config: &AppConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}
