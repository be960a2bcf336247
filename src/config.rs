//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use crate::executor::DEFAULT_LOOKBACK_DAYS;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub executor: ExecutorConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Health data store configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StoreConfig {
    /// Apple Health `export.xml` or the `.zip` archive containing it
    #[serde(default)]
    pub export_path: Option<PathBuf>,

    #[serde(default = "default_available")]
    pub available: bool,
}

fn default_available() -> bool {
    true
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            export_path: None,
            available: default_available(),
        }
    }
}

/// Query execution configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExecutorConfig {
    #[serde(default = "default_lookback_days")]
    pub default_lookback_days: i64,
}

fn default_lookback_days() -> i64 {
    DEFAULT_LOOKBACK_DAYS
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            default_lookback_days: default_lookback_days(),
        }
    }
}

/// How results are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            other => Err(format!("unknown output format: {}", other)),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("healthql").join("config.toml")),
            Some(PathBuf::from("./healthql.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                match Self::load_with_env(path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        tracing::debug!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides read through `lookup`; unparsable values are ignored
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("HEALTHQL_EXPORT_PATH") {
            self.store.export_path = Some(PathBuf::from(path));
        }

        if let Some(days) = lookup("HEALTHQL_LOOKBACK_DAYS") {
            match days.parse() {
                Ok(days) => self.executor.default_lookback_days = days,
                Err(_) => tracing::warn!(value = %days, "Ignoring invalid HEALTHQL_LOOKBACK_DAYS"),
            }
        }

        if let Some(format) = lookup("HEALTHQL_OUTPUT_FORMAT") {
            match format.parse() {
                Ok(format) => self.output.format = format,
                Err(e) => tracing::warn!("Ignoring HEALTHQL_OUTPUT_FORMAT: {}", e),
            }
        }

        if let Some(level) = lookup("HEALTHQL_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("HEALTHQL_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# HealthQL Configuration
#
# Environment variables override these settings:
# - HEALTHQL_EXPORT_PATH
# - HEALTHQL_LOOKBACK_DAYS
# - HEALTHQL_OUTPUT_FORMAT
# - HEALTHQL_LOG_LEVEL
# - HEALTHQL_LOG_FORMAT

[store]
# Apple Health export to query: export.xml, or the export.zip the Health app produces
# export_path = "~/Downloads/export.zip"

# Report health data as unavailable (queries fail with "store unavailable")
available = true

[executor]
# Days of history covered by GROUP BY queries without a date condition
default_lookback_days = 30

[output]
# Result format: table, json or csv
format = "table"

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_parses_to_defaults() {
        let config: Config = toml::from_str(&generate_default_config()).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.executor.default_lookback_days, 30);
        assert_eq!(config.output.format, OutputFormat::Table);
    }

    #[test]
    fn test_load_partial_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("healthql.toml");
        std::fs::write(
            &path,
            "[store]\nexport_path = \"/data/export.zip\"\n\n[output]\nformat = \"json\"\n",
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.store.export_path, Some(PathBuf::from("/data/export.zip")));
        assert!(config.store.available);
        assert_eq!(config.output.format, OutputFormat::Json);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_load_errors() {
        let err = Config::load(Path::new("/nonexistent/healthql.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bad.toml");
        std::fs::write(&path, "[executor]\ndefault_lookback_days = \"many\"\n").unwrap();
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("HEALTHQL_EXPORT_PATH", "/tmp/export.xml"),
            ("HEALTHQL_LOOKBACK_DAYS", "7"),
            ("HEALTHQL_OUTPUT_FORMAT", "CSV"),
            ("HEALTHQL_LOG_LEVEL", "debug"),
        ]
        .into();

        let mut config = Config::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.store.export_path, Some(PathBuf::from("/tmp/export.xml")));
        assert_eq!(config.executor.default_lookback_days, 7);
        assert_eq!(config.output.format, OutputFormat::Csv);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_invalid_overrides_ignored() {
        let mut config = Config::default();
        config.apply_overrides(|key| match key {
            "HEALTHQL_LOOKBACK_DAYS" => Some("soon".to_string()),
            "HEALTHQL_OUTPUT_FORMAT" => Some("xml".to_string()),
            _ => None,
        });
        assert_eq!(config, Config::default());
    }
}
