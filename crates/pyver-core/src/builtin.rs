//! The built-in Python version rule table.

use crate::extractors;
use crate::registry::RuleRegistry;
use crate::rule::Rule;

/// Content cap applied to every built-in rule.
pub const BUILTIN_MAX_FILE_SIZE: usize = 1024 * 1024;

/// Every built-in rule, sorted by priority.
pub fn builtin_rules() -> Vec<Rule> {
    let rule = |name: &str, priority: i32, glob: &str| {
        Rule::builder(name)
            .priority(priority)
            .file_pattern(glob)
            .max_file_size(BUILTIN_MAX_FILE_SIZE)
    };

    vec![
        rule("python-version-file", 1, ".python-version")
            .description("pyenv version file")
            .tags(["pinned", "pyenv"])
            .extractor_fn(extractors::python_version_file)
            .must_build(),
        rule("tool-versions", 2, ".tool-versions")
            .description("asdf/mise tool versions")
            .required_content("python")
            .tags(["pinned", "asdf"])
            .extractor_fn(extractors::tool_versions)
            .must_build(),
        rule("runtime-txt", 3, "runtime.txt")
            .description("PaaS buildpack runtime declaration")
            .required_content("python")
            .tags(["pinned", "paas"])
            .extractor_fn(extractors::runtime_txt)
            .must_build(),
        rule("pyproject-requires-python", 10, "pyproject.toml")
            .description("PEP 621 requires-python or Poetry python dependency")
            .required_content("python")
            .tags(["constraint", "packaging"])
            .extractor_fn(extractors::pyproject)
            .must_build(),
        rule("pipfile", 11, "Pipfile")
            .description("Pipenv [requires] section")
            .required_content("python_")
            .tags(["constraint", "pipenv"])
            .extractor_fn(extractors::pipfile)
            .must_build(),
        rule("setup-cfg", 20, "setup.cfg")
            .description("setuptools python_requires option")
            .required_content("python_requires")
            .tags(["constraint", "packaging"])
            .extractor_fn(extractors::setup_cfg)
            .must_build(),
        rule("setup-py", 21, "setup.py")
            .description("setuptools python_requires keyword")
            .required_content("python_requires")
            .tags(["constraint", "packaging"])
            .extractor_fn(extractors::setup_py)
            .must_build(),
        rule("conda-environment", 25, "environment*.y*ml")
            .description("conda environment dependencies")
            .required_content("python")
            .tags(["conda"])
            .extractor_fn(extractors::conda_environment)
            .must_build(),
        rule("dockerfile", 30, "Dockerfile*")
            .description("python base image tag")
            .required_content("python")
            .tags(["container"])
            .extractor_fn(extractors::dockerfile)
            .must_build(),
        rule("github-workflow", 40, "*.y*ml")
            .description("actions/setup-python python-version")
            .path_pattern(r"\.github/workflows/")
            .required_content("python-version")
            .tags(["ci"])
            .extractor_fn(extractors::github_workflow)
            .must_build(),
        rule("tox-envlist", 50, "tox.ini")
            .description("highest pyXY environment in tox envlist")
            .required_content("envlist")
            .tags(["ci", "tox"])
            .extractor_fn(extractors::tox_envlist)
            .must_build(),
    ]
}

/// A fresh registry holding every built-in rule.
pub fn builtin_registry() -> RuleRegistry {
    let registry = RuleRegistry::new();
    for rule in builtin_rules() {
        registry.must_register(rule);
    }
    registry
}
