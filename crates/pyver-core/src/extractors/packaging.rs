//! Extractors for packaging metadata that constrains the interpreter.

use std::sync::LazyLock;

use regex::Regex;

use super::{META_FIELD, text, version_result};
use crate::extract::{ExtractError, ExtractionResult};

static SETUP_CFG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*python_requires\s*=\s*(.+?)\s*$").expect("valid setup.cfg regex")
});

static SETUP_PY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"python_requires\s*=\s*['"]([^'"]+)['"]"#).expect("valid setup.py regex")
});

/// `pyproject.toml`: PEP 621 `project.requires-python`, falling back to
/// Poetry's `tool.poetry.dependencies.python`.
pub fn pyproject(content: &[u8], _filename: &str) -> Result<ExtractionResult, ExtractError> {
    let doc: toml::Table = toml::from_str(text(content)?)?;

    let requires = doc
        .get("project")
        .and_then(|p| p.get("requires-python"))
        .and_then(toml::Value::as_str);
    if let Some(specifier) = requires {
        return Ok(version_result(specifier, specifier, 0.9)
            .with_metadata(META_FIELD, "project.requires-python"));
    }

    let poetry = doc
        .get("tool")
        .and_then(|t| t.get("poetry"))
        .and_then(|p| p.get("dependencies"))
        .and_then(|d| d.get("python"));
    let specifier = match poetry {
        Some(toml::Value::String(s)) => Some(s.as_str()),
        Some(toml::Value::Table(t)) => t.get("version").and_then(toml::Value::as_str),
        _ => None,
    };
    Ok(match specifier {
        Some(specifier) => version_result(specifier, specifier, 0.85)
            .with_metadata(META_FIELD, "tool.poetry.dependencies.python"),
        None => ExtractionResult::not_found(),
    })
}

/// `Pipfile`: `[requires] python_full_version`, else `python_version`.
pub fn pipfile(content: &[u8], _filename: &str) -> Result<ExtractionResult, ExtractError> {
    let doc: toml::Table = toml::from_str(text(content)?)?;
    let Some(requires) = doc.get("requires").and_then(toml::Value::as_table) else {
        return Ok(ExtractionResult::not_found());
    };

    for field in ["python_full_version", "python_version"] {
        if let Some(version) = requires.get(field).and_then(toml::Value::as_str) {
            return Ok(version_result(version, version, 0.9)
                .with_metadata(META_FIELD, format!("requires.{field}")));
        }
    }
    Ok(ExtractionResult::not_found())
}

/// `setup.cfg`: `python_requires` under `[options]`.
pub fn setup_cfg(content: &[u8], _filename: &str) -> Result<ExtractionResult, ExtractError> {
    let text = text(content)?;
    Ok(match SETUP_CFG.captures(text) {
        Some(caps) => version_result(&caps[1], caps[0].trim(), 0.75)
            .with_metadata(META_FIELD, "options.python_requires"),
        None => ExtractionResult::not_found(),
    })
}

/// `setup.py`: a literal `python_requires="..."` keyword argument.
///
/// Computed values are not evaluated.
pub fn setup_py(content: &[u8], _filename: &str) -> Result<ExtractionResult, ExtractError> {
    let text = text(content)?;
    Ok(match SETUP_PY.captures(text) {
        Some(caps) => version_result(&caps[1], &caps[0], 0.7)
            .with_metadata(META_FIELD, "python_requires"),
        None => ExtractionResult::not_found(),
    })
}
