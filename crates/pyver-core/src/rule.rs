//! Extraction rules: named, prioritized bindings of a match condition to an
//! extractor.
//!
//! Rules are constructed through [`RuleBuilder`], which validates on
//! [`build`](RuleBuilder::build). The panicking
//! [`must_build`](RuleBuilder::must_build) is reserved for static rule tables
//! compiled into the binary.

use std::fmt;
use std::sync::Arc;

use regex::Regex;
use tracing::debug;

use crate::extract::{ExtractError, ExtractionResult, Extractor, clamp_confidence};
use crate::matcher::{self, MatchCondition};

/// Errors from rule validation and application.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    #[error("invalid rule {rule:?}: {reason}")]
    Validation { rule: String, reason: String },

    #[error("rule {0:?} is disabled")]
    Disabled(String),

    #[error("rule {rule:?}: content is {size} bytes, limit is {limit}")]
    SizeExceeded {
        rule: String,
        size: usize,
        limit: usize,
    },

    #[error("rule {rule:?}: extraction failed: {source}")]
    Extractor {
        rule: String,
        #[source]
        source: ExtractError,
    },

    #[error("execution cancelled before rule {rule:?}")]
    Cancelled { rule: String },
}

impl RuleError {
    fn validation(rule: &str, reason: impl Into<String>) -> Self {
        RuleError::Validation {
            rule: rule.to_string(),
            reason: reason.into(),
        }
    }

    /// The name of the rule this error belongs to.
    pub fn rule(&self) -> &str {
        match self {
            RuleError::Validation { rule, .. }
            | RuleError::SizeExceeded { rule, .. }
            | RuleError::Extractor { rule, .. }
            | RuleError::Cancelled { rule } => rule,
            RuleError::Disabled(rule) => rule,
        }
    }
}

/// A named extraction rule.
#[derive(Clone)]
pub struct Rule {
    name: String,
    description: String,
    priority: i32,
    condition: MatchCondition,
    extractor: Arc<dyn Extractor>,
    enabled: bool,
    tags: Vec<String>,
}

impl Rule {
    /// Start building a rule with the given unique name.
    pub fn builder(name: impl Into<String>) -> RuleBuilder {
        RuleBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Ordering key; lower values are evaluated first.
    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn condition(&self) -> &MatchCondition {
        &self.condition
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Mutable access to the tags of this (owned) copy.
    pub fn tags_mut(&mut self) -> &mut Vec<String> {
        &mut self.tags
    }

    /// Whether this rule carries any of the given tags.
    pub fn has_any_tag(&self, tags: &[String]) -> bool {
        self.tags.iter().any(|t| tags.contains(t))
    }

    pub(crate) fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Whether this rule applies to the file, judged by name and path only.
    ///
    /// A disabled rule never matches.
    pub fn matches(&self, filename: &str, filepath: &str) -> bool {
        self.enabled && matcher::matches(&self.condition, filename, filepath)
    }

    /// Fail with [`RuleError::SizeExceeded`] when `size` is over the cap.
    ///
    /// Lets callers reject oversized files before reading them.
    pub fn check_size(&self, size: usize) -> Result<(), RuleError> {
        match self.condition.max_file_size() {
            Some(limit) if size > limit => Err(RuleError::SizeExceeded {
                rule: self.name.clone(),
                size,
                limit,
            }),
            _ => Ok(()),
        }
    }

    /// Run the extractor against `content`.
    ///
    /// Content failing the `required_content` pre-filter yields a not-found
    /// result without invoking the extractor. Content over the size cap is an
    /// error.
    pub fn apply(&self, content: &[u8], filename: &str) -> Result<ExtractionResult, RuleError> {
        if !self.enabled {
            return Err(RuleError::Disabled(self.name.clone()));
        }

        self.check_size(content.len())?;

        if !self.condition.content_qualifies(content) {
            debug!(rule = %self.name, file = %filename, "Content pre-filter rejected file");
            return Ok(ExtractionResult::not_found());
        }

        let mut result =
            self.extractor
                .extract(content, filename)
                .map_err(|source| RuleError::Extractor {
                    rule: self.name.clone(),
                    source,
                })?;

        if result.found {
            if result.source.is_empty() {
                result.source = filename.to_string();
            }
            result.confidence = clamp_confidence(result.confidence);
        }
        Ok(result)
    }

    /// Check the structural invariants of this rule.
    pub fn validate(&self) -> Result<(), RuleError> {
        if self.name.is_empty() {
            return Err(RuleError::validation(&self.name, "name must not be empty"));
        }
        if !self.condition.has_location_filter() {
            return Err(RuleError::validation(
                &self.name,
                "at least one of file_pattern or path_pattern must be set",
            ));
        }
        if self
            .condition
            .path_pattern()
            .is_some_and(|re| re.as_str().is_empty())
        {
            return Err(RuleError::validation(&self.name, "path_pattern is empty"));
        }
        if self
            .condition
            .required_content()
            .is_some_and(|re| re.as_str().is_empty())
        {
            return Err(RuleError::validation(
                &self.name,
                "required_content is empty",
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("condition", &self.condition)
            .field("enabled", &self.enabled)
            .field("tags", &self.tags)
            .finish_non_exhaustive()
    }
}

/// Fluent builder for [`Rule`].
///
/// # Example
///
/// ```
/// use pyver_core::{ExtractionResult, Rule};
///
/// let rule = Rule::builder("runtime-txt")
///     .file_pattern("runtime.txt")
///     .priority(3)
///     .tag("pinned")
///     .extractor_fn(|_content: &[u8], _filename: &str| {
///         Ok(ExtractionResult::found("3.12", 0.95))
///     })
///     .build()
///     .unwrap();
/// assert!(rule.matches("runtime.txt", "/app/runtime.txt"));
/// ```
#[must_use]
pub struct RuleBuilder {
    name: String,
    description: String,
    priority: i32,
    file_pattern: String,
    path_pattern: Option<String>,
    required_content: Option<String>,
    max_file_size: usize,
    extractor: Option<Arc<dyn Extractor>>,
    enabled: bool,
    tags: Vec<String>,
}

impl RuleBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            priority: 0,
            file_pattern: String::new(),
            path_pattern: None,
            required_content: None,
            max_file_size: 0,
            extractor: None,
            enabled: true,
            tags: Vec::new(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Lower values are evaluated earlier.
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Glob matched against the bare filename.
    pub fn file_pattern(mut self, glob: impl Into<String>) -> Self {
        self.file_pattern = glob.into();
        self
    }

    /// Regex matched against the full path.
    pub fn path_pattern(mut self, regex: impl Into<String>) -> Self {
        self.path_pattern = Some(regex.into());
        self
    }

    /// Regex the content must match before the extractor runs.
    pub fn required_content(mut self, regex: impl Into<String>) -> Self {
        self.required_content = Some(regex.into());
        self
    }

    /// Content size cap in bytes (0 = unlimited).
    pub fn max_file_size(mut self, bytes: usize) -> Self {
        self.max_file_size = bytes;
        self
    }

    pub fn extractor(mut self, extractor: impl Extractor + 'static) -> Self {
        self.extractor = Some(Arc::new(extractor));
        self
    }

    /// Use a closure or function as the extractor.
    pub fn extractor_fn<F>(self, f: F) -> Self
    where
        F: Fn(&[u8], &str) -> Result<ExtractionResult, ExtractError> + Send + Sync + 'static,
    {
        self.extractor(f)
    }

    /// Use an already shared extractor.
    pub fn extractor_arc(mut self, extractor: Arc<dyn Extractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        let tag = tag.into();
        if !self.tags.contains(&tag) {
            self.tags.push(tag);
        }
        self
    }

    pub fn tags<I, S>(self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        tags.into_iter().fold(self, |b, t| b.tag(t))
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Compile patterns and validate the rule.
    pub fn build(self) -> Result<Rule, RuleError> {
        let name = self.name;
        let compile = |field: &str, source: Option<String>| -> Result<Option<Regex>, RuleError> {
            match source {
                None => Ok(None),
                Some(s) if s.is_empty() => {
                    Err(RuleError::validation(&name, format!("{field} is empty")))
                }
                Some(s) => Regex::new(&s).map(Some).map_err(|e| {
                    RuleError::validation(&name, format!("invalid {field}: {e}"))
                }),
            }
        };

        let path_pattern = compile("path_pattern", self.path_pattern)?;
        let required_content = compile("required_content", self.required_content)?;
        let condition = MatchCondition::new(
            self.file_pattern,
            path_pattern,
            required_content,
            self.max_file_size,
        )
        .map_err(|e| RuleError::validation(&name, format!("invalid file_pattern: {e}")))?;

        let extractor = self
            .extractor
            .ok_or_else(|| RuleError::validation(&name, "extractor must be set"))?;

        let rule = Rule {
            name,
            description: self.description,
            priority: self.priority,
            condition,
            extractor,
            enabled: self.enabled,
            tags: self.tags,
        };
        rule.validate()?;
        Ok(rule)
    }

    /// Build, panicking on an invalid rule.
    ///
    /// Only for static rule tables baked into the binary, where an invalid
    /// rule is a programming error.
    pub fn must_build(self) -> Rule {
        match self.build() {
            Ok(rule) => rule,
            Err(e) => panic!("static rule table contains an invalid rule: {e}"),
        }
    }
}
