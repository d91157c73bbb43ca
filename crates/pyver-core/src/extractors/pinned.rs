//! Extractors for files that pin an exact interpreter version.

use std::sync::LazyLock;

use regex::Regex;

use super::{META_FIELD, text, version_result};
use crate::extract::{ExtractError, ExtractionResult};

static RUNTIME_TXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*python-(\d+(?:\.\d+){0,2})\s*$").expect("valid runtime.txt regex")
});

/// `.python-version` (pyenv): the first non-comment line.
///
/// pyenv allows several versions, one per line; the first one is the active
/// interpreter. `system` carries no version information.
pub fn python_version_file(
    content: &[u8],
    _filename: &str,
) -> Result<ExtractionResult, ExtractError> {
    let text = text(content)?;
    let line = text
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty() && !l.starts_with('#'));

    let Some(line) = line else {
        return Ok(ExtractionResult::not_found());
    };
    let version = line.split_whitespace().next().unwrap_or(line);
    if version == "system" {
        return Ok(ExtractionResult::not_found());
    }
    Ok(version_result(version, line, 1.0))
}

/// `.tool-versions` (asdf/mise): the `python` line.
pub fn tool_versions(content: &[u8], _filename: &str) -> Result<ExtractionResult, ExtractError> {
    let text = text(content)?;
    for line in text.lines() {
        let line = line.split('#').next().unwrap_or_default().trim();
        let mut parts = line.split_whitespace();
        if parts.next() != Some("python") {
            continue;
        }
        return Ok(match parts.next() {
            Some(version) => version_result(version, line, 0.95),
            None => ExtractionResult::not_found(),
        });
    }
    Ok(ExtractionResult::not_found())
}

/// `runtime.txt` (Heroku-style buildpacks): `python-3.12.1`.
pub fn runtime_txt(content: &[u8], _filename: &str) -> Result<ExtractionResult, ExtractError> {
    let text = text(content)?;
    Ok(match RUNTIME_TXT.captures(text) {
        Some(caps) => version_result(&caps[1], caps[0].trim(), 0.95)
            .with_metadata(META_FIELD, "runtime"),
        None => ExtractionResult::not_found(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_python_version_file() {
        let result = python_version_file(b"# pinned\n\n3.11.4\n3.10.0\n", ".python-version").unwrap();
        assert!(result.found);
        assert_eq!(result.value, "3.11.4");
        assert_eq!(result.confidence, 1.0);
        assert_eq!(result.metadata["kind"], "pinned");
    }

    #[test]
    fn test_python_version_file_variants() {
        let result = python_version_file(b"pypy3.10-7.3.15", ".python-version").unwrap();
        assert_eq!(result.value, "pypy3.10-7.3.15");

        assert!(!python_version_file(b"system\n", ".python-version").unwrap().found);
        assert!(!python_version_file(b"  \n# only comments\n", ".python-version").unwrap().found);
    }

    #[test]
    fn test_python_version_file_rejects_binary() {
        let err = python_version_file(b"\xff\xfe3.11", ".python-version").unwrap_err();
        assert!(matches!(err, ExtractError::Utf8(_)));
    }

    #[test]
    fn test_tool_versions() {
        let content = b"nodejs 20.11.0\npython 3.12.2 3.11.8 # default first\nrust 1.76.0\n";
        let result = tool_versions(content, ".tool-versions").unwrap();
        assert_eq!(result.value, "3.12.2");
        assert_eq!(result.raw_value, "python 3.12.2 3.11.8");
        assert_eq!(result.confidence, 0.95);
    }

    #[test]
    fn test_tool_versions_without_python() {
        let result = tool_versions(b"nodejs 20.11.0\n", ".tool-versions").unwrap();
        assert!(!result.found);
        assert!(!tool_versions(b"python\n", ".tool-versions").unwrap().found);
    }

    #[test]
    fn test_runtime_txt() {
        let result = runtime_txt(b"python-3.12.1\n", "runtime.txt").unwrap();
        assert_eq!(result.value, "3.12.1");
        assert_eq!(result.raw_value, "python-3.12.1");
        assert_eq!(result.metadata["field"], "runtime");

        assert!(!runtime_txt(b"ruby-3.2\n", "runtime.txt").unwrap().found);
    }
}
