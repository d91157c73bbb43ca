//! Execution engine. Runs matching rules against file content and reconciles
//! their results.
//!
//! Rules run in ascending priority order. Every accepted result is kept in
//! [`ExecutionResult::results`]; the highest-confidence one becomes
//! [`ExecutionResult::best_result`]. A failing rule is recorded in
//! [`ExecutionResult::errors`] and never aborts the batch; cancellation stops
//! it at the next rule boundary.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Serialize, Serializer};
use tracing::{debug, info, warn};

use crate::extract::ExtractionResult;
use crate::registry::RuleRegistry;
use crate::rule::{Rule, RuleError};

/// Cooperative cancellation flag shared between a caller and running
/// executions.
///
/// Checked once per rule boundary; a running extractor is never interrupted.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Caller-supplied options for one execution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionOptions {
    /// Stop after the first accepted result.
    pub stop_on_first_match: bool,
    /// Stop once this many results were accepted (0 = unlimited).
    pub max_results: usize,
    /// Discard results below this confidence (0.0 = keep everything).
    pub min_confidence: f64,
    /// Only run rules carrying at least one of these tags (empty = all).
    pub tags: Vec<String>,
}

impl ExecutionOptions {
    /// Builder: stop after the first accepted result.
    pub fn stop_on_first_match(mut self, stop: bool) -> Self {
        self.stop_on_first_match = stop;
        self
    }

    /// Builder: cap the number of accepted results.
    pub fn max_results(mut self, max: usize) -> Self {
        self.max_results = max;
        self
    }

    /// Builder: set the confidence floor.
    pub fn min_confidence(mut self, min: f64) -> Self {
        self.min_confidence = min;
        self
    }

    /// Builder: add a tag to the tag filter.
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }
}

/// A rule that failed during an execution.
#[derive(Debug, Serialize)]
pub struct RuleFailure {
    pub rule: String,
    #[serde(serialize_with = "serialize_display")]
    pub error: RuleError,
}

fn serialize_display<S: Serializer>(error: &RuleError, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(error)
}

/// The outcome of one execution against one file.
#[derive(Debug, Default, Serialize)]
pub struct ExecutionResult {
    /// The file path the rules ran against.
    pub file: String,
    /// Accepted results, in rule priority order.
    pub results: Vec<ExtractionResult>,
    /// The highest-confidence accepted result; ties keep the earlier one.
    pub best_result: Option<ExtractionResult>,
    /// Number of rules actually invoked.
    pub rules_applied: usize,
    /// Per-rule failures, including cancellation.
    pub errors: Vec<RuleFailure>,
}

impl ExecutionResult {
    fn new(file: &str) -> Self {
        Self {
            file: file.to_string(),
            ..Self::default()
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Whether any result was accepted.
    pub fn found(&self) -> bool {
        self.best_result.is_some()
    }

    /// Distinct extracted values, in result order.
    pub fn values(&self) -> Vec<&str> {
        let mut values: Vec<&str> = Vec::new();
        for result in &self.results {
            if !values.contains(&result.value.as_str()) {
                values.push(&result.value);
            }
        }
        values
    }

    /// Take the first error, if any.
    fn into_first_error(self) -> Result<Self, RuleError> {
        let mut result = self;
        if result.errors.is_empty() {
            Ok(result)
        } else {
            Err(result.errors.swap_remove(0).error)
        }
    }
}

/// Runs rules from a shared registry.
///
/// Cheap to share across threads; concurrent executions only take the
/// registry's read lock while selecting rules.
#[derive(Debug, Clone)]
pub struct Engine {
    registry: Arc<RuleRegistry>,
}

impl Engine {
    pub fn new(registry: Arc<RuleRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    /// Run every enabled rule matching the file.
    pub fn execute(
        &self,
        cancel: &CancelToken,
        content: &[u8],
        filename: &str,
        filepath: &str,
        options: &ExecutionOptions,
    ) -> ExecutionResult {
        let rules = self.registry.find_matching_rules(filename, filepath);
        execute_rules(&rules, cancel, content, filename, filepath, options)
    }

    /// Return the first accepted result in priority order.
    ///
    /// Fails with the first execution error if any rule failed.
    pub fn execute_first_match(
        &self,
        cancel: &CancelToken,
        content: &[u8],
        filename: &str,
        filepath: &str,
        options: &ExecutionOptions,
    ) -> Result<Option<ExtractionResult>, RuleError> {
        let options = options.clone().stop_on_first_match(true).max_results(1);
        let result = self
            .execute(cancel, content, filename, filepath, &options)
            .into_first_error()?;
        Ok(result.results.into_iter().next())
    }

    /// Run all matching rules and return the highest-confidence result.
    ///
    /// Fails with the first execution error if any rule failed.
    pub fn execute_best_match(
        &self,
        cancel: &CancelToken,
        content: &[u8],
        filename: &str,
        filepath: &str,
        options: &ExecutionOptions,
    ) -> Result<Option<ExtractionResult>, RuleError> {
        let options = options.clone().stop_on_first_match(false).max_results(0);
        let result = self
            .execute(cancel, content, filename, filepath, &options)
            .into_first_error()?;
        Ok(result.best_result)
    }
}

/// Run an explicit, priority-ordered rule list against one file.
///
/// The tag filter in `options` is applied here; `rules` is otherwise used as
/// given.
pub fn execute_rules(
    rules: &[Rule],
    cancel: &CancelToken,
    content: &[u8],
    filename: &str,
    filepath: &str,
    options: &ExecutionOptions,
) -> ExecutionResult {
    let mut out = ExecutionResult::new(filepath);
    let mut best: Option<usize> = None;

    let selected = rules
        .iter()
        .filter(|rule| options.tags.is_empty() || rule.has_any_tag(&options.tags));

    for rule in selected {
        if cancel.is_cancelled() {
            info!(file = %filepath, rule = %rule.name(), "Execution cancelled");
            out.errors.push(RuleFailure {
                rule: rule.name().to_string(),
                error: RuleError::Cancelled {
                    rule: rule.name().to_string(),
                },
            });
            break;
        }

        out.rules_applied += 1;
        let result = match rule.apply(content, filename) {
            Ok(result) => result,
            Err(error) => {
                warn!(file = %filepath, rule = %rule.name(), %error, "Rule failed");
                out.errors.push(RuleFailure {
                    rule: rule.name().to_string(),
                    error,
                });
                continue;
            }
        };

        if !result.found {
            debug!(file = %filepath, rule = %rule.name(), "Rule found nothing");
            continue;
        }

        if options.min_confidence > 0.0 && result.confidence < options.min_confidence {
            debug!(
                file = %filepath,
                rule = %rule.name(),
                confidence = result.confidence,
                min = options.min_confidence,
                "Result below confidence floor"
            );
            continue;
        }

        debug!(
            file = %filepath,
            rule = %rule.name(),
            value = %result.value,
            confidence = result.confidence,
            "Rule accepted"
        );
        let is_best = best.is_none_or(|i| result.confidence > out.results[i].confidence);
        out.results.push(result);
        if is_best {
            best = Some(out.results.len() - 1);
        }

        if options.stop_on_first_match {
            break;
        }
        if options.max_results > 0 && out.results.len() >= options.max_results {
            break;
        }
    }

    out.best_result = best.map(|i| out.results[i].clone());
    out
}
