//! Extraction results and the extractor seam.

use std::collections::BTreeMap;

use serde::Serialize;

/// Errors raised by an extractor while inspecting content.
///
/// Extractors should prefer returning a not-found result over an error when a
/// file simply does not contain what they look for.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("content is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("{0}")]
    Parse(String),
}

/// The outcome of running one extractor against one file.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExtractionResult {
    /// Whether the extractor found a value. When false, the other fields are
    /// ignored by callers.
    pub found: bool,
    /// The extracted fact (e.g. "3.11.4" or ">=3.9").
    pub value: String,
    /// Where the value came from. Defaults to the filename.
    pub source: String,
    /// Reliability score in `0.0..=1.0`.
    pub confidence: f64,
    /// The unprocessed matched text.
    pub raw_value: String,
    /// Open-ended extra details.
    pub metadata: BTreeMap<String, String>,
}

impl ExtractionResult {
    /// A result reporting that nothing was found.
    pub fn not_found() -> Self {
        Self::default()
    }

    /// A found value with the given confidence (clamped to `0.0..=1.0`).
    pub fn found(value: impl Into<String>, confidence: f64) -> Self {
        Self {
            found: true,
            value: value.into(),
            confidence: clamp_confidence(confidence),
            ..Self::default()
        }
    }

    /// Builder: set the source.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Builder: set the raw matched text.
    pub fn with_raw_value(mut self, raw: impl Into<String>) -> Self {
        self.raw_value = raw.into();
        self
    }

    /// Builder: add a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Clamp a confidence into `0.0..=1.0`; NaN becomes 0.0.
pub fn clamp_confidence(confidence: f64) -> f64 {
    if confidence.is_nan() {
        0.0
    } else {
        confidence.clamp(0.0, 1.0)
    }
}

/// A pure, deterministic function from file content to an extraction result.
///
/// Any `Fn(&[u8], &str) -> Result<ExtractionResult, ExtractError>` that is
/// `Send + Sync` is an extractor, so plain functions and closures can be
/// registered directly.
pub trait Extractor: Send + Sync {
    /// Inspect `content` (read from `filename`) and report what was found.
    fn extract(&self, content: &[u8], filename: &str) -> Result<ExtractionResult, ExtractError>;
}

impl<F> Extractor for F
where
    F: Fn(&[u8], &str) -> Result<ExtractionResult, ExtractError> + Send + Sync,
{
    fn extract(&self, content: &[u8], filename: &str) -> Result<ExtractionResult, ExtractError> {
        self(content, filename)
    }
}
