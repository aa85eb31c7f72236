//! Configuration management for boxscale

use std::path::Path;
use serde::{Deserialize, Serialize};
use crate::error::{Result, BoxScaleError};

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Worker pool and source limits
    pub processing: ProcessingConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Worker pool and per-file processing settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Number of worker threads (None = detected core count)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,

    /// Maximum source file size to decode (in bytes)
    pub max_file_size: u64,

    /// Maximum decoded image size (width * height)
    pub max_image_pixels: u64,

    /// Files larger than this are memory-mapped instead of read (in bytes)
    pub mmap_threshold: u64,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            workers: None,
            max_file_size: 500 * 1024 * 1024, // 500MB
            max_image_pixels: 500_000_000,    // 500 megapixels
            mmap_threshold: 100 * 1024 * 1024, // 100MB
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level or filter directive (trace, debug, info, warn, error)
    pub level: String,

    /// Enable JSON logging
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .map_err(|e| BoxScaleError::config(
                format!("Failed to read config file {:?}: {}", path.as_ref(), e)
            ))?;

        match extension_of(path.as_ref()).as_str() {
            "toml" => toml::from_str(&content).map_err(Into::into),
            "yaml" | "yml" => serde_yaml::from_str(&content).map_err(Into::into),
            _ => Err(BoxScaleError::config(
                "Unsupported config file format. Use .toml or .yaml"
            )),
        }
    }

    /// Save configuration to file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = match extension_of(path.as_ref()).as_str() {
            "toml" => toml::to_string_pretty(self)
                .map_err(|e| BoxScaleError::config(format!("TOML serialization failed: {}", e)))?,
            "yaml" | "yml" => serde_yaml::to_string(self)
                .map_err(|e| BoxScaleError::config(format!("YAML serialization failed: {}", e)))?,
            _ => return Err(BoxScaleError::config(
                "Unsupported config file format. Use .toml or .yaml"
            )),
        };

        std::fs::write(&path, content)
            .map_err(|e| BoxScaleError::config(
                format!("Failed to write config file {:?}: {}", path.as_ref(), e)
            ))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.processing.workers == Some(0) {
            return Err(BoxScaleError::config("Worker count must be greater than 0"));
        }

        if self.processing.max_file_size == 0 {
            return Err(BoxScaleError::config("max_file_size must be greater than 0"));
        }

        if self.processing.max_image_pixels == 0 {
            return Err(BoxScaleError::config("max_image_pixels must be greater than 0"));
        }

        if self.logging.level.trim().is_empty() {
            return Err(BoxScaleError::config("Log level must not be empty"));
        }

        Ok(())
    }
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.processing.workers, None);
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let mut config = Config::default();
        config.processing.workers = Some(6);

        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(config, parsed);

        let yaml_str = serde_yaml::to_string(&config).unwrap();
        let parsed: Config = serde_yaml::from_str(&yaml_str).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let parsed: Config = toml::from_str("[processing]\nworkers = 3\n").unwrap();
        assert_eq!(parsed.processing.workers, Some(3));
        assert_eq!(parsed.processing.max_file_size, ProcessingConfig::default().max_file_size);
        assert_eq!(parsed.logging, LoggingConfig::default());
    }

    #[test]
    fn test_config_file_io() {
        let dir = TempDir::new().unwrap();
        let config = Config::default();

        let toml_path = dir.path().join("boxscale.toml");
        config.to_file(&toml_path).unwrap();
        assert_eq!(Config::from_file(&toml_path).unwrap(), config);

        let yaml_path = dir.path().join("boxscale.yml");
        config.to_file(&yaml_path).unwrap();
        assert_eq!(Config::from_file(&yaml_path).unwrap(), config);

        let ini_path = dir.path().join("boxscale.ini");
        assert!(config.to_file(&ini_path).is_err());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = Config::default();
        config.processing.workers = Some(0);
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.processing.max_image_pixels = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.logging.level = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_file_is_serde_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[processing\nworkers = ").unwrap();
        assert!(matches!(Config::from_file(&path), Err(BoxScaleError::SerdeError(_))));
    }
}
