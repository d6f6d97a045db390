//! Application configuration.

use crate::error::{AppError, AppResult};
use ledger_position::SessionizerConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "LEDGER_CONFIG";

/// Config file used when neither CLI nor environment name one.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Fill file, or directory of fill pages.
    #[serde(default = "default_input_path")]
    pub input_path: PathBuf,
    /// Directory receiving `closed_positions.jsonl` and `open_positions.jsonl`.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub sessionizer: SessionizerConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

fn default_input_path() -> PathBuf {
    PathBuf::from("data/fills.json")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("data/positions")
}

/// Telemetry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Print Prometheus exposition text after the import.
    #[serde(default)]
    pub metrics_dump: bool,
}

fn default_log_level() -> String {
    ledger_telemetry::DEFAULT_FILTER.to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            metrics_dump: false,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            input_path: default_input_path(),
            output_dir: default_output_dir(),
            sessionizer: SessionizerConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

impl AppConfig {
    /// Resolve the config path: explicit > `LEDGER_CONFIG` > default.
    pub fn resolve_path(explicit: Option<&str>) -> String {
        explicit
            .map(str::to_string)
            .or_else(|| std::env::var(CONFIG_ENV).ok())
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
    }

    /// Load configuration, falling back to defaults when the file is absent.
    pub fn load(path: &str) -> AppResult<Self> {
        if Path::new(path).exists() {
            Self::from_file(path)
        } else {
            tracing::warn!(path = %path, "Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load from a specific file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;

        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> AppResult<Self> {
        toml::from_str(content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))
    }

    /// Apply command-line overrides.
    pub fn with_overrides(mut self, input: Option<PathBuf>, output_dir: Option<PathBuf>) -> Self {
        if let Some(input) = input {
            self.input_path = input;
        }
        if let Some(output_dir) = output_dir {
            self.output_dir = output_dir;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_position::ZeroCrossPolicy;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.input_path, PathBuf::from("data/fills.json"));
        assert_eq!(config.output_dir, PathBuf::from("data/positions"));
        assert_eq!(config.sessionizer.zero_cross, ZeroCrossPolicy::Preserve);
        assert!(!config.telemetry.metrics_dump);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = AppConfig::from_toml(
            r#"
            input_path = "exports/btc"

            [sessionizer]
            zero_cross = "split"
            "#,
        )
        .unwrap();

        assert_eq!(config.input_path, PathBuf::from("exports/btc"));
        assert_eq!(config.output_dir, PathBuf::from("data/positions"));
        assert_eq!(config.sessionizer.zero_cross, ZeroCrossPolicy::Split);
        assert_eq!(config.telemetry.log_level, "info,ledger=debug");
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = AppConfig::from_toml("[sessionizer]\nzero_cross = \"sideways\"").unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = AppConfig::load("definitely/not/here.toml").unwrap();
        assert_eq!(config.input_path, PathBuf::from("data/fills.json"));
    }

    #[test]
    fn test_cli_overrides() {
        let config = AppConfig::default()
            .with_overrides(Some(PathBuf::from("in.jsonl")), None);
        assert_eq!(config.input_path, PathBuf::from("in.jsonl"));
        assert_eq!(config.output_dir, PathBuf::from("data/positions"));
    }

    #[test]
    fn test_explicit_path_wins() {
        assert_eq!(AppConfig::resolve_path(Some("custom.toml")), "custom.toml");
    }

    #[test]
    fn test_config_serialization() {
        let toml_str = toml::to_string(&AppConfig::default()).unwrap();
        assert!(toml_str.contains("input_path"));
        assert!(toml_str.contains("zero_cross"));
    }
}
