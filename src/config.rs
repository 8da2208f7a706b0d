// =============================================================================
// CONFIGURATION - Load settings from config.toml
// =============================================================================
//
// Provides sensible defaults if the config file is missing or has errors.

use anyhow::{Context, Result};
use log::LevelFilter;
use serde::Deserialize;
use std::path::Path;

/// Root configuration structure
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub app: AppConfig,
    pub device: DeviceConfig,
    pub debug: DebugConfig,
}

/// Application identity reported to the driver
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub name: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: "tri-upload".to_string(),
        }
    }
}

/// Physical device selection
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub prefer_discrete_gpu: bool,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            prefer_discrete_gpu: true,
        }
    }
}

/// Debug settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    pub validation_layers: bool,
    pub log_level: String,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            validation_layers: true,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from file, falling back to defaults if not found
    pub fn load() -> Self {
        Self::load_from_path("config.toml").unwrap_or_else(|e| {
            log::warn!("Failed to load config.toml: {:#}. Using defaults.", e);
            Config::default()
        })
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config = Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        log::info!("Loaded configuration from {:?}", path);
        log::debug!("Config: {:?}", config);

        Ok(config)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Log level as a `log` filter
    pub fn log_filter(&self) -> LevelFilter {
        match self.debug.log_level.to_lowercase().as_str() {
            "off" => LevelFilter::Off,
            "error" => LevelFilter::Error,
            "warn" => LevelFilter::Warn,
            "info" => LevelFilter::Info,
            "debug" => LevelFilter::Debug,
            "trace" => LevelFilter::Trace,
            _ => {
                log::warn!(
                    "Unknown log level '{}', defaulting to info",
                    self.debug.log_level
                );
                LevelFilter::Info
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.app.name, "tri-upload");
        assert!(config.device.prefer_discrete_gpu);
        assert!(config.debug.validation_layers);
        assert_eq!(config.log_filter(), LevelFilter::Info);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = Config::parse(
            r#"
            [debug]
            log_level = "DEBUG"

            [device]
            prefer_discrete_gpu = false
            "#,
        )
        .unwrap();

        assert_eq!(config.log_filter(), LevelFilter::Debug);
        assert!(config.debug.validation_layers);
        assert!(!config.device.prefer_discrete_gpu);
        assert_eq!(config.app.name, "tri-upload");
    }

    #[test]
    fn unknown_log_level_falls_back_to_info() {
        let config = Config::parse("[debug]\nlog_level = \"loud\"").unwrap();
        assert_eq!(config.log_filter(), LevelFilter::Info);
    }

    #[test]
    fn malformed_toml_is_an_error() {
        assert!(Config::parse("[debug\nlog_level = 1").is_err());
        assert!(Config::parse("[debug]\nvalidation_layers = \"yes\"").is_err());
    }

    #[test]
    fn missing_file_gives_defaults() {
        let config = Config::load_from_path("does/not/exist/config.toml").unwrap();
        assert_eq!(config.app.name, "tri-upload");
    }
}
