//! Configurable extractors for project-specific conventions.

use regex::Regex;

use super::{ExtractorConfigError, text, version_result};
use crate::extract::{ExtractError, ExtractionResult, Extractor};

/// Read an optional confidence option, accepting integers and floats.
fn confidence_option(options: &toml::Table, default: f64) -> Result<f64, ExtractorConfigError> {
    match options.get("confidence") {
        None => Ok(default),
        Some(toml::Value::Float(f)) => Ok(*f),
        Some(toml::Value::Integer(i)) => Ok(*i as f64),
        Some(other) => Err(ExtractorConfigError::NotANumber {
            key: "confidence",
            found: other.type_str(),
        }),
    }
}

fn string_option<'a>(
    options: &'a toml::Table,
    key: &'static str,
    kind: &'static str,
) -> Result<&'a str, ExtractorConfigError> {
    options
        .get(key)
        .and_then(toml::Value::as_str)
        .ok_or(ExtractorConfigError::MissingOption { kind, key })
}

/// Extracts the first capture group of a regular expression, or the whole
/// match when the pattern has no groups.
#[derive(Debug, Clone)]
pub struct RegexExtractor {
    pattern: Regex,
    confidence: f64,
}

impl RegexExtractor {
    pub const DEFAULT_CONFIDENCE: f64 = 0.5;

    pub fn new(pattern: &str, confidence: f64) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            confidence,
        })
    }

    /// Build from `pattern` (required) and `confidence` options.
    pub fn from_options(options: &toml::Table) -> Result<Self, ExtractorConfigError> {
        let pattern = string_option(options, "pattern", "regex")?;
        let confidence = confidence_option(options, Self::DEFAULT_CONFIDENCE)?;
        Ok(Self::new(pattern, confidence)?)
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }
}

impl Extractor for RegexExtractor {
    fn extract(&self, content: &[u8], _filename: &str) -> Result<ExtractionResult, ExtractError> {
        let text = text(content)?;
        let Some(caps) = self.pattern.captures(text) else {
            return Ok(ExtractionResult::not_found());
        };
        let whole = &caps[0];
        let value = caps.get(1).map_or(whole, |m| m.as_str());
        Ok(version_result(value, whole, self.confidence))
    }
}

/// Reports a fixed value for every file it is applied to.
///
/// Paired with a file pattern and required content, this maps the presence
/// of a marker to a known interpreter version.
#[derive(Debug, Clone, PartialEq)]
pub struct LiteralExtractor {
    value: String,
    confidence: f64,
}

impl LiteralExtractor {
    pub const DEFAULT_CONFIDENCE: f64 = 1.0;

    pub fn new(value: impl Into<String>, confidence: f64) -> Self {
        Self {
            value: value.into(),
            confidence,
        }
    }

    /// Build from `value` (required) and `confidence` options.
    pub fn from_options(options: &toml::Table) -> Result<Self, ExtractorConfigError> {
        let value = string_option(options, "value", "literal")?;
        let confidence = confidence_option(options, Self::DEFAULT_CONFIDENCE)?;
        Ok(Self::new(value, confidence))
    }
}

impl Extractor for LiteralExtractor {
    fn extract(&self, _content: &[u8], _filename: &str) -> Result<ExtractionResult, ExtractError> {
        Ok(version_result(&self.value, &self.value, self.confidence))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn options(src: &str) -> toml::Table {
        toml::from_str(src).unwrap()
    }

    #[test]
    fn test_regex_extractor_capture_group() {
        let extractor =
            RegexExtractor::from_options(&options(r#"pattern = 'PYTHON_VERSION=(\S+)'"#)).unwrap();
        let result = extractor
            .extract(b"NODE_VERSION=20\nPYTHON_VERSION=3.12.1\n", ".env")
            .unwrap();
        assert_eq!(result.value, "3.12.1");
        assert_eq!(result.raw_value, "PYTHON_VERSION=3.12.1");
        assert_eq!(result.confidence, RegexExtractor::DEFAULT_CONFIDENCE);
    }

    #[test]
    fn test_regex_extractor_whole_match() {
        let extractor = RegexExtractor::new(r"3\.\d+", 0.3).unwrap();
        let result = extractor.extract(b"image: py-3.10-runtime", "app.yaml").unwrap();
        assert_eq!(result.value, "3.10");
        assert_eq!(result.confidence, 0.3);

        assert!(!extractor.extract(b"nothing here", "app.yaml").unwrap().found);
    }

    #[test]
    fn test_regex_extractor_option_errors() {
        let err = RegexExtractor::from_options(&options("confidence = 0.4")).unwrap_err();
        assert!(matches!(err, ExtractorConfigError::MissingOption { key: "pattern", .. }));

        let err = RegexExtractor::from_options(&options("pattern = '(unclosed'")).unwrap_err();
        assert!(matches!(err, ExtractorConfigError::InvalidPattern(_)));
        assert!(err.to_string().starts_with("invalid `pattern` option"), "{err}");

        let err =
            RegexExtractor::from_options(&options("pattern = 'x'\nconfidence = 'high'")).unwrap_err();
        assert!(matches!(
            err,
            ExtractorConfigError::NotANumber {
                key: "confidence",
                found: "string"
            }
        ));
    }

    #[test]
    fn test_literal_extractor() {
        let extractor =
            LiteralExtractor::from_options(&options("value = '3.11'\nconfidence = 1")).unwrap();
        assert_eq!(extractor, LiteralExtractor::new("3.11", 1.0));

        let result = extractor.extract(b"anything", "marker").unwrap();
        assert!(result.found);
        assert_eq!(result.value, "3.11");
        assert_eq!(result.metadata["kind"], "pinned");
    }

    #[test]
    fn test_literal_extractor_requires_value() {
        let err = LiteralExtractor::from_options(&toml::Table::new()).unwrap_err();
        assert_eq!(err.to_string(), "literal extractor requires a string `value` option");
    }
}
