//! The built-in rule table against realistic project files.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use pyver_core::{CancelToken, Engine, ExecutionOptions, ExecutionResult, builtin_registry};

fn scan(engine: &Engine, path: &str, content: &str) -> ExecutionResult {
    let filename = path.rsplit('/').next().unwrap_or(path);
    engine.execute(
        &CancelToken::new(),
        content.as_bytes(),
        filename,
        path,
        &ExecutionOptions::default(),
    )
}

fn builtin_engine() -> Engine {
    Engine::new(Arc::new(builtin_registry()))
}

#[test_log::test]
fn test_pinned_files() {
    let engine = builtin_engine();

    let result = scan(&engine, "/app/.python-version", "3.12.3\n");
    let best = result.best_result.unwrap();
    assert_eq!(best.value, "3.12.3");
    assert_eq!(best.source, ".python-version");
    assert_eq!(best.confidence, 1.0);

    let result = scan(&engine, "/app/.tool-versions", "nodejs 20.11.0\npython 3.11.9\n");
    assert_eq!(result.best_result.unwrap().value, "3.11.9");

    let result = scan(&engine, "/app/runtime.txt", "python-3.10.14\n");
    assert_eq!(result.best_result.unwrap().value, "3.10.14");
}

#[test_log::test]
fn test_packaging_files() {
    let engine = builtin_engine();

    let pyproject = r#"
[build-system]
requires = ["hatchling"]

[project]
name = "service"
requires-python = ">=3.10"
dependencies = ["httpx"]
"#;
    let result = scan(&engine, "/srv/service/pyproject.toml", pyproject);
    let best = result.best_result.unwrap();
    assert_eq!(best.value, ">=3.10");
    assert_eq!(best.metadata["kind"], "constraint");
    assert_eq!(best.metadata["field"], "project.requires-python");

    let pipfile = "[[source]]\nurl = \"https://pypi.org/simple\"\n\n[requires]\npython_version = \"3.11\"\n";
    let result = scan(&engine, "/srv/service/Pipfile", pipfile);
    assert_eq!(result.best_result.unwrap().value, "3.11");

    let setup_cfg = "[metadata]\nname = service\n\n[options]\npackages = find:\npython_requires = >=3.8\n";
    let result = scan(&engine, "/srv/service/setup.cfg", setup_cfg);
    assert_eq!(result.best_result.unwrap().value, ">=3.8");
}

#[test_log::test]
fn test_prefilter_skips_extractor() {
    let engine = builtin_engine();

    let result = scan(&engine, "/srv/setup.py", "from setuptools import setup\nsetup(name='x')\n");
    assert_eq!(result.rules_applied, 1);
    assert!(!result.found());
    assert!(!result.has_errors());
}

#[test_log::test]
fn test_deploy_and_ci_files() {
    let engine = builtin_engine();

    let dockerfile = "FROM python:3.12-slim\nWORKDIR /app\nCOPY . .\nCMD [\"python\", \"-m\", \"service\"]\n";
    let result = scan(&engine, "/srv/Dockerfile", dockerfile);
    assert_eq!(result.best_result.unwrap().value, "3.12");

    let workflow = "on: push\njobs:\n  test:\n    runs-on: ubuntu-latest\n    steps:\n      - uses: actions/setup-python@v5\n        with:\n          python-version: \"3.11\"\n";
    let result = scan(&engine, "/srv/.github/workflows/test.yml", workflow);
    let best = result.best_result.unwrap();
    assert_eq!(best.value, "3.11");
    assert_eq!(best.confidence, 0.6);

    let result = scan(&engine, "/srv/deploy/test.yml", workflow);
    assert_eq!(result.rules_applied, 0);

    let conda = "name: service\ndependencies:\n  - python=3.10\n  - pip\n";
    let result = scan(&engine, "/srv/environment.yml", conda);
    assert_eq!(result.best_result.unwrap().value, "3.10");

    let tox = "[tox]\nenvlist = py39, py310, py311\n";
    let result = scan(&engine, "/srv/tox.ini", tox);
    assert_eq!(result.best_result.unwrap().value, "3.11");
}

#[test_log::test]
fn test_malformed_file_reports_rule_error() {
    let engine = builtin_engine();

    let result = scan(&engine, "/srv/pyproject.toml", "[project\nrequires-python = '>=3.9'\n");
    assert!(!result.found());
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].rule, "pyproject-requires-python");
}

#[test_log::test]
fn test_oversized_file_is_rejected() {
    let engine = builtin_engine();

    let mut content = String::from("3.12.0\n");
    content.push_str(&"#".repeat(pyver_core::builtin::BUILTIN_MAX_FILE_SIZE));
    let result = scan(&engine, "/app/.python-version", &content);
    assert!(!result.found());
    assert!(matches!(
        result.errors[0].error,
        pyver_core::RuleError::SizeExceeded { .. }
    ));
}
