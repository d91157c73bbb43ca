//! Configuration builders for tests.
//!
//! Use [`TestConfigBuilder`] to create customised [`AppConfig`] values without
//! writing TOML, and [`rule_config`] for individual `[[rules]]` entries.

use pyver_config::{AppConfig, RuleConfig};

/// A `[[rules]]` entry with the given name, filename glob, and extractor kind.
pub fn rule_config(name: &str, file_pattern: &str, extractor: &str) -> RuleConfig {
    RuleConfig {
        name: name.to_string(),
        file_pattern: file_pattern.to_string(),
        extractor: extractor.to_string(),
        enabled: true,
        ..RuleConfig::default()
    }
}

/// Fluent builder for [`AppConfig`] in tests.
///
/// # Example
///
/// ```ignore
/// let config = TestConfigBuilder::new()
///     .builtin(false)
///     .rule(rule_config("marker", ".pyver", "python-version-file"))
///     .build();
/// ```
pub struct TestConfigBuilder {
    config: AppConfig,
}

impl TestConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
        }
    }

    pub fn log_level(mut self, level: &str) -> Self {
        self.config.logging.level = level.to_string();
        self
    }

    /// Load (or skip) the built-in rule table.
    pub fn builtin(mut self, enabled: bool) -> Self {
        self.config.builtin.enabled = enabled;
        self
    }

    pub fn disable_builtin(mut self, name: &str) -> Self {
        self.config.builtin.disabled.push(name.to_string());
        self
    }

    pub fn stop_on_first_match(mut self, stop: bool) -> Self {
        self.config.execution.stop_on_first_match = stop;
        self
    }

    pub fn min_confidence(mut self, min: f64) -> Self {
        self.config.execution.min_confidence = min;
        self
    }

    pub fn tag(mut self, tag: &str) -> Self {
        self.config.execution.tags.push(tag.to_string());
        self
    }

    pub fn max_depth(mut self, depth: usize) -> Self {
        self.config.scan.max_depth = depth;
        self
    }

    pub fn rule(mut self, rule: RuleConfig) -> Self {
        self.config.rules.push(rule);
        self
    }

    pub fn build(self) -> AppConfig {
        self.config
    }
}

impl Default for TestConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
