#![deny(unsafe_code)]

//! Configuration loading and validation for pyver.
//!
//! Loads TOML configuration files and validates them against expected schemas.
//! Provides the [`AppConfig`] type as the central configuration structure,
//! including the declarative `[[rules]]` table that `pyver-core` turns into
//! registered extraction rules.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

/// Top-level application configuration.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Default execution options applied to every file.
    #[serde(default)]
    pub execution: ExecutionConfig,

    /// Built-in rule table settings.
    #[serde(default)]
    pub builtin: BuiltinConfig,

    /// Directory walking settings for the CLI content provider.
    #[serde(default)]
    pub scan: ScanConfig,

    /// Additional rules defined declaratively.
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g. "info", "debug", "trace").
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Default options for a single execution batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Stop after the first accepted result.
    #[serde(default)]
    pub stop_on_first_match: bool,

    /// Stop once this many results were accepted (0 = unlimited).
    #[serde(default)]
    pub max_results: usize,

    /// Discard results below this confidence (0.0 = keep everything).
    #[serde(default)]
    pub min_confidence: f64,

    /// Only run rules carrying at least one of these tags (empty = all).
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Settings for the built-in rule table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltinConfig {
    /// Start from the built-in rules.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Built-in rules that stay registered but disabled.
    #[serde(default)]
    pub disabled: Vec<String>,
}

impl Default for BuiltinConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            disabled: Vec::new(),
        }
    }
}

fn default_true() -> bool {
    true
}

/// Directory walking configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Maximum directory depth below each scan root.
    #[serde(default = "default_scan_max_depth")]
    pub max_depth: usize,

    /// Directory names that are never descended into.
    #[serde(default = "default_scan_ignore_dirs")]
    pub ignore_dirs: Vec<String>,

    /// Maximum number of files processed concurrently.
    #[serde(default = "default_scan_concurrency")]
    pub concurrency: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_depth: default_scan_max_depth(),
            ignore_dirs: default_scan_ignore_dirs(),
            concurrency: default_scan_concurrency(),
        }
    }
}

fn default_scan_max_depth() -> usize {
    4
}

fn default_scan_ignore_dirs() -> Vec<String> {
    [".git", "node_modules", ".venv", "venv", "__pycache__", ".tox", "target"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_scan_concurrency() -> usize {
    8
}

/// A single extraction rule as expressed in TOML.
///
/// ## TOML Example
///
/// ```toml
/// [[rules]]
/// name = "custom-version-file"
/// priority = 3
/// file_pattern = ".pyver"
/// tags = ["custom"]
/// extractor = "regex"
///
/// [rules.options]
/// pattern = '(\d+\.\d+(?:\.\d+)?)'
/// confidence = 0.9
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Unique rule name. Replaces a built-in rule of the same name.
    pub name: String,

    /// Human-readable description.
    #[serde(default)]
    pub description: String,

    /// Priority (lower = evaluated earlier).
    #[serde(default)]
    pub priority: i32,

    /// Glob matched against the bare filename.
    #[serde(default)]
    pub file_pattern: String,

    /// Regex matched against the full path.
    #[serde(default)]
    pub path_pattern: String,

    /// Regex the content must match before the extractor runs.
    #[serde(default)]
    pub required_content: String,

    /// Content size cap in bytes (0 = unlimited).
    #[serde(default)]
    pub max_file_size: usize,

    /// Tags for filtering.
    #[serde(default)]
    pub tags: Vec<String>,

    /// Whether the rule starts enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Extractor kind (e.g. "regex", "literal", "pyproject").
    pub extractor: String,

    /// Kind-specific extractor options.
    #[serde(default)]
    pub options: toml::Table,
}

impl AppConfig {
    /// Load configuration from a TOML file at the given path using async I/O.
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = tokio::fs::read_to_string(path).await?;
        let config = Self::parse(&content)?;
        tracing::debug!(path = %path.display(), rules = config.rules.len(), "Loaded config");
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::Validation(format!(
                "logging.level must be one of {:?}, got {:?}",
                valid_levels, self.logging.level
            )));
        }

        let min = self.execution.min_confidence;
        if !(0.0..=1.0).contains(&min) {
            return Err(ConfigError::Validation(format!(
                "execution.min_confidence must be in [0.0, 1.0], got {min}"
            )));
        }

        if self.scan.max_depth == 0 {
            return Err(ConfigError::Validation(
                "scan.max_depth must be at least 1".to_string(),
            ));
        }
        if self.scan.concurrency == 0 {
            return Err(ConfigError::Validation(
                "scan.concurrency must be at least 1".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for (i, rule) in self.rules.iter().enumerate() {
            if rule.name.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "rules[{i}].name must not be empty"
                )));
            }
            if !seen.insert(rule.name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "rules[{i}].name {:?} is defined more than once",
                    rule.name
                )));
            }
            if rule.file_pattern.is_empty() && rule.path_pattern.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "rules[{i}] ({}) must set file_pattern or path_pattern",
                    rule.name
                )));
            }
            if rule.extractor.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "rules[{i}] ({}) must name an extractor",
                    rule.name
                )));
            }
        }

        Ok(())
    }
}
