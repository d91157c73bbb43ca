//! Turns an [`AppConfig`] into a populated [`RuleRegistry`].

use pyver_config::{AppConfig, ExecutionConfig, RuleConfig};
use tracing::{debug, warn};

use crate::builtin::builtin_registry;
use crate::engine::ExecutionOptions;
use crate::extractors::{ExtractorConfigError, ExtractorKind};
use crate::registry::RuleRegistry;
use crate::rule::{Rule, RuleError};

/// Errors raised while building a registry from configuration.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("rule {rule:?}: unknown extractor kind {kind:?}")]
    UnknownExtractor { rule: String, kind: String },

    #[error("rule {rule:?}: {source}")]
    InvalidOption {
        rule: String,
        #[source]
        source: ExtractorConfigError,
    },

    #[error(transparent)]
    Rule(#[from] RuleError),
}

/// Build a registry from the built-in table and the configured `[[rules]]`.
///
/// Configured rules replace built-in rules of the same name.
pub fn registry_from_config(config: &AppConfig) -> Result<RuleRegistry, LoadError> {
    let registry = if config.builtin.enabled {
        builtin_registry()
    } else {
        RuleRegistry::new()
    };

    for name in &config.builtin.disabled {
        if !registry.disable(name) {
            warn!(rule = %name, "Cannot disable unknown built-in rule");
        }
    }

    for rule_config in &config.rules {
        registry.register(rule_from_config(rule_config)?)?;
    }

    debug!(
        rules = registry.len(),
        builtin = config.builtin.enabled,
        configured = config.rules.len(),
        "Built rule registry from config"
    );
    Ok(registry)
}

/// Build one rule from its TOML form.
pub fn rule_from_config(config: &RuleConfig) -> Result<Rule, LoadError> {
    let kind: ExtractorKind =
        config
            .extractor
            .parse()
            .map_err(|_| LoadError::UnknownExtractor {
                rule: config.name.clone(),
                kind: config.extractor.clone(),
            })?;
    let extractor = kind
        .build(&config.options)
        .map_err(|source| LoadError::InvalidOption {
            rule: config.name.clone(),
            source,
        })?;

    let mut builder = Rule::builder(&config.name)
        .description(&config.description)
        .priority(config.priority)
        .file_pattern(&config.file_pattern)
        .max_file_size(config.max_file_size)
        .tags(&config.tags)
        .enabled(config.enabled)
        .extractor_arc(extractor);
    if !config.path_pattern.is_empty() {
        builder = builder.path_pattern(&config.path_pattern);
    }
    if !config.required_content.is_empty() {
        builder = builder.required_content(&config.required_content);
    }
    Ok(builder.build()?)
}

impl From<&ExecutionConfig> for ExecutionOptions {
    fn from(config: &ExecutionConfig) -> Self {
        Self {
            stop_on_first_match: config.stop_on_first_match,
            max_results: config.max_results,
            min_confidence: config.min_confidence,
            tags: config.tags.clone(),
        }
    }
}
