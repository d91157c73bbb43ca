//! Extractors for deployment, CI and environment files.

use std::sync::LazyLock;

use regex::Regex;

use super::{META_FIELD, highest_version, text, version_result};
use crate::extract::{ExtractError, ExtractionResult};

/// Metadata key listing every version seen when several were present.
const META_CANDIDATES: &str = "candidates";

static DOCKER_FROM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?mi)^\s*FROM\s+(?:--platform=\S+\s+)?(\S*python):(\d+(?:\.\d+){0,2})\S*")
        .expect("valid Dockerfile regex")
});

static WORKFLOW_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+\.\d+(?:\.\d+)?").expect("valid workflow regex"));

static TOX_ENVLIST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*envlist\s*=\s*(.*(?:\n[ \t]+\S.*)*)").expect("valid envlist regex")
});

static TOX_ENV: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bpy(\d)\.?(\d+)\b").expect("valid tox env regex"));

static CONDA_PYTHON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^\s*-\s*["']?python\s*(==|>=|<=|!=|~=|=|>|<)\s*([0-9][^\s#"']*)"#)
        .expect("valid conda regex")
});

/// `Dockerfile`: the tag of the last `FROM *python:<version>` stage.
pub fn dockerfile(content: &[u8], _filename: &str) -> Result<ExtractionResult, ExtractError> {
    let text = text(content)?;
    Ok(match DOCKER_FROM.captures_iter(text).last() {
        Some(caps) => version_result(&caps[2], caps[0].trim(), 0.8)
            .with_metadata("image", &caps[1]),
        None => ExtractionResult::not_found(),
    })
}

/// GitHub Actions workflow: the highest version on any `python-version:` line.
///
/// Only inline values and flow sequences are read; block sequences under a
/// `python-version:` key are not.
pub fn github_workflow(
    content: &[u8],
    _filename: &str,
) -> Result<ExtractionResult, ExtractError> {
    let text = text(content)?;
    let mut candidates = Vec::new();
    let mut raw = "";
    for line in text.lines() {
        let Some((key, rest)) = line.split_once(':') else {
            continue;
        };
        if key.trim().trim_start_matches("- ").trim() != "python-version" {
            continue;
        }
        let before = candidates.len();
        candidates.extend(WORKFLOW_VERSION.find_iter(rest).map(|m| m.as_str()));
        if raw.is_empty() && candidates.len() > before {
            raw = line.trim();
        }
    }

    let Some(best) = highest_version(candidates.iter().copied()) else {
        return Ok(ExtractionResult::not_found());
    };
    let mut result = version_result(best, raw, 0.6).with_metadata(META_FIELD, "python-version");
    if candidates.len() > 1 {
        result = result.with_metadata(META_CANDIDATES, candidates.join(","));
    }
    Ok(result)
}

/// `tox.ini`: the highest `pyXY` environment in `envlist`.
pub fn tox_envlist(content: &[u8], _filename: &str) -> Result<ExtractionResult, ExtractError> {
    let text = text(content)?;
    let Some(caps) = TOX_ENVLIST.captures(text) else {
        return Ok(ExtractionResult::not_found());
    };
    let envlist = caps[1].trim();

    let candidates: Vec<String> = TOX_ENV
        .captures_iter(envlist)
        .map(|env| format!("{}.{}", &env[1], &env[2]))
        .collect();
    let Some(best) = highest_version(candidates.iter().map(String::as_str)) else {
        return Ok(ExtractionResult::not_found());
    };
    Ok(version_result(best, envlist, 0.5)
        .with_metadata(META_FIELD, "tox.envlist")
        .with_metadata(META_CANDIDATES, candidates.join(",")))
}

/// Conda `environment.yml`: the `python` dependency specifier.
///
/// Conda's single `=` is a prefix match, so `python=3.11` reports `3.11`.
pub fn conda_environment(
    content: &[u8],
    _filename: &str,
) -> Result<ExtractionResult, ExtractError> {
    let text = text(content)?;
    let Some(caps) = CONDA_PYTHON.captures(text) else {
        return Ok(ExtractionResult::not_found());
    };
    let (op, version) = (&caps[1], &caps[2]);
    let value = if op == "=" {
        version.to_string()
    } else {
        format!("{op}{version}")
    };
    Ok(version_result(&value, caps[0].trim(), 0.75).with_metadata(META_FIELD, "dependencies"))
}
