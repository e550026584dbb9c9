//! Configuration module for vpcsynth
//!
//! Handles loading and merging configuration from multiple sources:
//! - Default values
//! - User configuration (~/.vpcsynth.toml)
//! - Project configuration (./vpcsynth.toml)
//! - Explicit path (`--config` / `VPCSYNTH_CONFIG`)
//! - Environment variables
//!
//! Command-line flags are applied on top by the CLI.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, ErrorContext, Result};
use crate::template::TemplateFormat;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default settings
    pub defaults: Defaults,

    /// Colors and output settings
    pub colors: ColorsConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

/// Default configuration values
///
/// Every field is optional so that a later file only overrides what it sets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Defaults {
    /// Topology document used when `--topology` is not given
    pub topology: Option<PathBuf>,

    /// Stack name override
    pub stack_name: Option<String>,

    /// Region override
    pub region: Option<String>,

    /// Template format (`json` or `yaml`); JSON when unset
    pub format: Option<String>,

    /// Directory `synth` writes into when `--out` is a bare file name
    pub out_dir: Option<PathBuf>,

    /// Template description override
    pub description: Option<String>,
}

/// Default log level when neither the config nor `-v`/`RUST_LOG` set one
pub const DEFAULT_LOG_LEVEL: &str = "warn";

/// Colors configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorsConfig {
    /// Enable colors; on when unset
    pub enabled: Option<bool>,
}

/// Logging settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level used when no `-v` flag or `RUST_LOG` is given
    pub log_level: Option<String>,
}

impl Config {
    /// Load configuration from all sources
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        let mut config = Config::default();

        for path in Self::get_config_paths(config_path) {
            if path.exists() {
                tracing::debug!("Loading config from {}", path.display());
                config = match config.merge_from_file(&path) {
                    Ok(merged) => merged,
                    Err(e) if config_path.is_some() => {
                        return Err(Error::Config(format!(
                            "Failed to load config file {}: {}",
                            path.display(),
                            e
                        )));
                    }
                    Err(e) => return Err(e),
                };
            } else if config_path == Some(&path) {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
        }

        config.apply_env_overrides();

        Ok(config)
    }

    /// Get the list of configuration file paths to check, lowest precedence
    /// first
    pub fn get_config_paths(explicit_path: Option<&PathBuf>) -> Vec<PathBuf> {
        if let Some(path) = explicit_path {
            return vec![path.clone()];
        }

        let mut paths = Vec::new();

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".vpcsynth.toml"));
        }

        paths.push(PathBuf::from("vpcsynth.toml"));

        if let Ok(env_config) = std::env::var("VPCSYNTH_CONFIG") {
            paths.push(PathBuf::from(env_config));
        }

        paths
    }

    /// Merge configuration from a file
    fn merge_from_file(&self, path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        let file_config: Config = match extension {
            "yml" | "yaml" => serde_yaml::from_str(&content)?,
            "json" => serde_json::from_str(&content)?,
            "toml" => toml::from_str(&content)?,
            _ => toml::from_str(&content)
                .or_else(|_| serde_yaml::from_str(&content))
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?,
        };

        Ok(self.merge(file_config))
    }

    /// Merge another config into this one; set values in `other` win
    pub fn merge(&self, other: Config) -> Config {
        Config {
            defaults: Defaults {
                topology: other
                    .defaults
                    .topology
                    .or_else(|| self.defaults.topology.clone()),
                stack_name: other
                    .defaults
                    .stack_name
                    .or_else(|| self.defaults.stack_name.clone()),
                region: other
                    .defaults
                    .region
                    .or_else(|| self.defaults.region.clone()),
                format: other
                    .defaults
                    .format
                    .or_else(|| self.defaults.format.clone()),
                out_dir: other
                    .defaults
                    .out_dir
                    .or_else(|| self.defaults.out_dir.clone()),
                description: other
                    .defaults
                    .description
                    .or_else(|| self.defaults.description.clone()),
            },
            colors: ColorsConfig {
                enabled: other.colors.enabled.or(self.colors.enabled),
            },
            logging: LoggingConfig {
                log_level: other
                    .logging
                    .log_level
                    .or_else(|| self.logging.log_level.clone()),
            },
        }
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        if let Ok(name) = std::env::var("VPCSYNTH_STACK_NAME") {
            self.defaults.stack_name = Some(name);
        }

        if let Ok(region) = std::env::var("VPCSYNTH_REGION") {
            self.defaults.region = Some(region);
        }

        if let Ok(format) = std::env::var("VPCSYNTH_FORMAT") {
            self.defaults.format = Some(format);
        }

        if std::env::var("NO_COLOR").is_ok() || std::env::var("VPCSYNTH_NO_COLOR").is_ok() {
            self.colors.enabled = Some(false);
        }
    }

    /// Effective template format, falling back to JSON when unset or unknown
    pub fn template_format(&self) -> TemplateFormat {
        let Some(name) = self.defaults.format.as_deref() else {
            return TemplateFormat::Json;
        };
        TemplateFormat::parse(name).unwrap_or_else(|| {
            tracing::warn!("Unknown template format '{}' in config, using json", name);
            TemplateFormat::Json
        })
    }

    /// Whether colored output is enabled
    pub fn colors_enabled(&self) -> bool {
        self.colors.enabled.unwrap_or(true)
    }

    /// Configured log level
    pub fn log_level(&self) -> &str {
        self.logging.log_level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    /// Load from a specific file only
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Config::default().merge_from_file(path.as_ref())
    }
}
