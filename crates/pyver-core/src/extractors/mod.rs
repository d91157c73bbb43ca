//! Built-in Python version extractors and the extractor factory.
//!
//! Each built-in extractor is a plain function usable as an
//! [`Extractor`](crate::Extractor). [`ExtractorKind`] maps the kind strings
//! used in configuration to constructors.

mod deploy;
mod generic;
mod packaging;
mod pinned;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

pub use deploy::{conda_environment, dockerfile, github_workflow, tox_envlist};
pub use generic::{LiteralExtractor, RegexExtractor};
pub use packaging::{pipfile, pyproject, setup_cfg, setup_py};
pub use pinned::{python_version_file, runtime_txt, tool_versions};

use thiserror::Error;

use crate::extract::{ExtractError, ExtractionResult, Extractor};

/// Metadata key describing whether a value is an exact pin or a constraint.
pub const META_KIND: &str = "kind";
/// Metadata key naming the field a value was read from.
pub const META_FIELD: &str = "field";

/// Errors raised while resolving an extractor from configuration.
#[derive(Debug, Error)]
pub enum ExtractorConfigError {
    #[error("unknown extractor kind: {0}")]
    UnknownKind(String),

    #[error("{kind} extractor requires a string `{key}` option")]
    MissingOption {
        kind: &'static str,
        key: &'static str,
    },

    #[error("option `{key}` must be a number, got {found}")]
    NotANumber {
        key: &'static str,
        found: &'static str,
    },

    #[error("invalid `pattern` option: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// Extractor kinds that configuration can refer to by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtractorKind {
    PythonVersionFile,
    ToolVersions,
    RuntimeTxt,
    Pyproject,
    Pipfile,
    SetupCfg,
    SetupPy,
    Conda,
    Dockerfile,
    Workflow,
    Tox,
    Regex,
    Literal,
}

impl ExtractorKind {
    /// Every kind, in documentation order.
    pub const ALL: [ExtractorKind; 13] = [
        ExtractorKind::PythonVersionFile,
        ExtractorKind::ToolVersions,
        ExtractorKind::RuntimeTxt,
        ExtractorKind::Pyproject,
        ExtractorKind::Pipfile,
        ExtractorKind::SetupCfg,
        ExtractorKind::SetupPy,
        ExtractorKind::Conda,
        ExtractorKind::Dockerfile,
        ExtractorKind::Workflow,
        ExtractorKind::Tox,
        ExtractorKind::Regex,
        ExtractorKind::Literal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractorKind::PythonVersionFile => "python-version-file",
            ExtractorKind::ToolVersions => "tool-versions",
            ExtractorKind::RuntimeTxt => "runtime-txt",
            ExtractorKind::Pyproject => "pyproject",
            ExtractorKind::Pipfile => "pipfile",
            ExtractorKind::SetupCfg => "setup-cfg",
            ExtractorKind::SetupPy => "setup-py",
            ExtractorKind::Conda => "conda",
            ExtractorKind::Dockerfile => "dockerfile",
            ExtractorKind::Workflow => "workflow",
            ExtractorKind::Tox => "tox",
            ExtractorKind::Regex => "regex",
            ExtractorKind::Literal => "literal",
        }
    }

    /// Construct an extractor of this kind from its configuration options.
    ///
    /// Built-in format kinds take no options; `regex` and `literal` close over
    /// theirs.
    pub fn build(
        &self,
        options: &toml::Table,
    ) -> Result<Arc<dyn Extractor>, ExtractorConfigError> {
        let extractor: Arc<dyn Extractor> = match self {
            ExtractorKind::PythonVersionFile => Arc::new(python_version_file),
            ExtractorKind::ToolVersions => Arc::new(tool_versions),
            ExtractorKind::RuntimeTxt => Arc::new(runtime_txt),
            ExtractorKind::Pyproject => Arc::new(pyproject),
            ExtractorKind::Pipfile => Arc::new(pipfile),
            ExtractorKind::SetupCfg => Arc::new(setup_cfg),
            ExtractorKind::SetupPy => Arc::new(setup_py),
            ExtractorKind::Conda => Arc::new(conda_environment),
            ExtractorKind::Dockerfile => Arc::new(dockerfile),
            ExtractorKind::Workflow => Arc::new(github_workflow),
            ExtractorKind::Tox => Arc::new(tox_envlist),
            ExtractorKind::Regex => Arc::new(RegexExtractor::from_options(options)?),
            ExtractorKind::Literal => Arc::new(LiteralExtractor::from_options(options)?),
        };
        Ok(extractor)
    }
}

impl fmt::Display for ExtractorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExtractorKind {
    type Err = ExtractorConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ExtractorKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ExtractorConfigError::UnknownKind(s.to_string()))
    }
}

// ── Shared helpers ──────────────────────────────────────────────────────

/// Decode content as UTF-8.
pub(crate) fn text(content: &[u8]) -> Result<&str, ExtractError> {
    Ok(std::str::from_utf8(content)?)
}

/// Classify a version string as an exact pin or a constraint.
pub(crate) fn version_kind(value: &str) -> &'static str {
    let v = value.trim();
    let exact = v.starts_with("==") && !v.contains(',') && !v.contains('*');
    let bare = v.starts_with(|c: char| c.is_ascii_digit()) && !v.contains(['*', ',']);
    if exact || bare {
        "pinned"
    } else {
        "constraint"
    }
}

/// A found result annotated with its kind and raw text.
pub(crate) fn version_result(value: &str, raw: &str, confidence: f64) -> ExtractionResult {
    ExtractionResult::found(value.trim(), confidence)
        .with_raw_value(raw)
        .with_metadata(META_KIND, version_kind(value))
}

/// Numeric components of a dotted version ("3.11.4" → [3, 11, 4]).
pub(crate) fn version_key(version: &str) -> Vec<u32> {
    version
        .split('.')
        .map_while(|part| part.parse().ok())
        .collect()
}

/// The highest of several dotted versions.
pub(crate) fn highest_version<'a>(versions: impl IntoIterator<Item = &'a str>) -> Option<&'a str> {
    versions.into_iter().max_by_key(|v| version_key(v))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trips_through_strings() {
        for kind in ExtractorKind::ALL {
            assert_eq!(kind.as_str().parse::<ExtractorKind>().unwrap(), kind);
        }
        let err = "xml".parse::<ExtractorKind>().unwrap_err();
        assert!(matches!(err, ExtractorConfigError::UnknownKind(ref kind) if kind == "xml"));
        assert_eq!(err.to_string(), "unknown extractor kind: xml");
    }

    #[test]
    fn test_builtin_kinds_ignore_options() {
        let options = toml::Table::new();
        let extractor = ExtractorKind::RuntimeTxt.build(&options).unwrap();
        let result = extractor.extract(b"python-3.12.1\n", "runtime.txt").unwrap();
        assert_eq!(result.value, "3.12.1");
    }

    #[test]
    fn test_regex_kind_requires_pattern() {
        let err = ExtractorKind::Regex.build(&toml::Table::new()).err().unwrap();
        assert!(matches!(
            err,
            ExtractorConfigError::MissingOption {
                kind: "regex",
                key: "pattern"
            }
        ));
    }

    #[test]
    fn test_version_kind() {
        assert_eq!(version_kind("3.11.4"), "pinned");
        assert_eq!(version_kind("==3.11"), "pinned");
        assert_eq!(version_kind(">=3.9"), "constraint");
        assert_eq!(version_kind("^3.10"), "constraint");
        assert_eq!(version_kind("3.*"), "constraint");
        assert_eq!(version_kind(">=3.9,<3.13"), "constraint");
    }

    #[test]
    fn test_highest_version() {
        assert_eq!(highest_version(["3.9", "3.12", "3.10"]), Some("3.12"));
        assert_eq!(highest_version(["3.11", "3.11.2"]), Some("3.11.2"));
        assert_eq!(highest_version(Vec::<&str>::new()), None);
    }
}
