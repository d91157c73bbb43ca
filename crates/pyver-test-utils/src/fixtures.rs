//! Canned extractors and rules for engine tests.

use pyver_core::{CancelToken, ExtractError, ExtractionResult, Extractor, Rule};

/// An extractor that always finds `value` with `confidence`.
pub fn fixed_extractor(value: &str, confidence: f64) -> impl Extractor + Clone + 'static {
    let value = value.to_string();
    move |_content: &[u8], _filename: &str| -> Result<ExtractionResult, ExtractError> {
        Ok(ExtractionResult::found(value.clone(), confidence))
    }
}

/// An extractor that never finds anything.
pub fn empty_extractor(_content: &[u8], _filename: &str) -> Result<ExtractionResult, ExtractError> {
    Ok(ExtractionResult::not_found())
}

/// An extractor that always fails with a parse error.
pub fn failing_extractor(message: &str) -> impl Extractor + Clone + 'static {
    let message = message.to_string();
    move |_content: &[u8], _filename: &str| -> Result<ExtractionResult, ExtractError> {
        Err(ExtractError::Parse(message.clone()))
    }
}

/// An extractor that finds `value` and then cancels `token`, so that no
/// later rule in the same execution runs.
pub fn cancelling_extractor(token: CancelToken, value: &str) -> impl Extractor + Clone + 'static {
    let value = value.to_string();
    move |_content: &[u8], _filename: &str| -> Result<ExtractionResult, ExtractError> {
        token.cancel();
        Ok(ExtractionResult::found(value.clone(), 1.0))
    }
}

/// A rule matching every file, with the given priority and extractor.
pub fn catch_all_rule(name: &str, priority: i32, extractor: impl Extractor + 'static) -> Rule {
    Rule::builder(name)
        .file_pattern("*")
        .priority(priority)
        .extractor(extractor)
        .build()
        .unwrap_or_else(|e| panic!("fixture rule {name:?} is invalid: {e}"))
}
