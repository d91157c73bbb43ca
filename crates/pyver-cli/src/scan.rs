//! Directory walking and concurrent rule execution for `pyver scan`.

use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::ValueEnum;
use pyver_core::extractors::META_KIND;
use pyver_core::{
    CancelToken, Engine, ExecutionOptions, ExecutionResult, ExtractionResult, Rule, RuleFailure,
    execute_rules,
};
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// How many results to keep per file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Every accepted result.
    All,
    /// The first accepted result in priority order.
    First,
    /// The highest-confidence result.
    Best,
}

impl Mode {
    pub fn apply(self, options: ExecutionOptions) -> ExecutionOptions {
        match self {
            Mode::All => options,
            Mode::First => options.stop_on_first_match(true).max_results(1),
            Mode::Best => options.stop_on_first_match(false).max_results(0),
        }
    }
}

/// Limits for the directory walk.
pub struct WalkOptions<'a> {
    /// Directory levels to visit; 1 reads only the top-level entries.
    pub max_depth: usize,
    /// Directory names never descended into.
    pub ignore_dirs: &'a [String],
}

/// Expand `roots` into a sorted list of regular files.
///
/// Roots that are files are kept as given. Symlinks to files are included;
/// symlinked directories are not followed.
pub async fn collect_files(roots: &[PathBuf], walk: &WalkOptions<'_>) -> Result<Vec<PathBuf>> {
    for root in roots {
        tokio::fs::metadata(root)
            .await
            .with_context(|| format!("cannot read {}", root.display()))?;
    }

    let roots = roots.to_vec();
    let max_depth = walk.max_depth;
    let ignore_dirs = walk.ignore_dirs.to_vec();
    tokio::task::spawn_blocking(move || walk_roots(&roots, max_depth, &ignore_dirs))
        .await
        .context("directory walk panicked")
}

fn walk_roots(roots: &[PathBuf], max_depth: usize, ignore_dirs: &[String]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for root in roots {
        let entries = WalkDir::new(root)
            .max_depth(max_depth)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| !is_ignored_dir(e, ignore_dirs));
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable entry");
                    continue;
                }
            };
            if entry.file_type().is_file() || (entry.path_is_symlink() && entry.path().is_file()) {
                files.push(entry.into_path());
            }
        }
    }
    files.sort();
    files.dedup();
    files
}

fn is_ignored_dir(entry: &DirEntry, ignore_dirs: &[String]) -> bool {
    let ignored = entry.depth() > 0
        && entry.file_type().is_dir()
        && ignore_dirs.iter().any(|d| entry.file_name() == d.as_str());
    if ignored {
        debug!(dir = %entry.path().display(), "Ignoring directory");
    }
    ignored
}

/// The winning result across all scanned files.
#[derive(Debug, Clone, Serialize)]
pub struct BestVersion {
    pub file: String,
    #[serde(flatten)]
    pub result: ExtractionResult,
}

/// A matched file that could not be read or evaluated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileError {
    pub file: String,
    pub error: String,
}

/// Everything `pyver scan` reports.
#[derive(Debug, Default, Serialize)]
pub struct ScanReport {
    /// Files walked, including those no rule applies to.
    pub examined: usize,
    /// Per-file outcomes for files at least one rule matched, in path order.
    pub files: Vec<ExecutionResult>,
    /// Matched files whose content never reached the rules, in path order.
    pub unreadable: Vec<FileError>,
    pub best: Option<BestVersion>,
    /// Whether the scan was interrupted; results are partial.
    pub cancelled: bool,
}

enum Scanned {
    Executed(ExecutionResult),
    Failed(FileError),
}

/// Run the matching rules against every file.
///
/// At most `concurrency` files are read and evaluated at once. Extraction
/// runs on the blocking pool. Once `cancel` fires no new file is started.
pub async fn scan_files(
    engine: &Engine,
    files: Vec<PathBuf>,
    options: ExecutionOptions,
    concurrency: usize,
    cancel: &CancelToken,
) -> ScanReport {
    let examined = files.len();
    let options = Arc::new(options);
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut tasks = JoinSet::new();

    for (index, path) in files.into_iter().enumerate() {
        let Some(filename) = path.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
            continue;
        };
        let filepath = path.to_string_lossy().into_owned();
        let rules = engine.registry().find_matching_rules(&filename, &filepath);
        if rules.is_empty() {
            continue;
        }

        let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
            break;
        };
        if cancel.is_cancelled() {
            break;
        }

        let options = Arc::clone(&options);
        let cancel = cancel.clone();
        tasks.spawn(async move {
            let _permit = permit;
            let scanned = scan_one(path, filename, filepath, rules, options, cancel).await;
            (index, scanned)
        });
    }

    let mut outcomes = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => warn!(error = %e, "Scan task failed"),
        }
    }
    outcomes.sort_by_key(|(index, _)| *index);

    let mut files = Vec::new();
    let mut unreadable = Vec::new();
    for (_, scanned) in outcomes {
        match scanned {
            Scanned::Executed(result) => files.push(result),
            Scanned::Failed(failed) => unreadable.push(failed),
        }
    }

    ScanReport {
        examined,
        best: overall_best(&files),
        files,
        unreadable,
        cancelled: cancel.is_cancelled(),
    }
}

async fn scan_one(
    path: PathBuf,
    filename: String,
    filepath: String,
    rules: Vec<Rule>,
    options: Arc<ExecutionOptions>,
    cancel: CancelToken,
) -> Scanned {
    let size = match tokio::fs::metadata(&path).await {
        Ok(meta) => meta.len(),
        Err(e) => return unreadable(filepath, &e),
    };
    if let Some(rejected) = reject_oversized(&rules, &options, size, &filepath) {
        return Scanned::Executed(rejected);
    }

    let content = match tokio::fs::read(&path).await {
        Ok(content) => content,
        Err(e) => return unreadable(filepath, &e),
    };
    let file = filepath.clone();
    let executed = tokio::task::spawn_blocking(move || {
        execute_rules(&rules, &cancel, &content, &filename, &filepath, &options)
    })
    .await;
    match executed {
        Ok(result) => Scanned::Executed(result),
        Err(e) => {
            warn!(file = %file, error = %e, "Rule execution panicked");
            Scanned::Failed(FileError {
                error: format!("rule execution panicked: {e}"),
                file,
            })
        }
    }
}

fn unreadable(file: String, error: &std::io::Error) -> Scanned {
    warn!(file = %file, %error, "Failed to read file");
    Scanned::Failed(FileError {
        file,
        error: error.to_string(),
    })
}

/// The size failures for a file larger than every selected rule allows.
///
/// `None` when no rule is selected or some selected rule accepts `size`; the
/// file is then read and executed as usual.
fn reject_oversized(
    rules: &[Rule],
    options: &ExecutionOptions,
    size: u64,
    filepath: &str,
) -> Option<ExecutionResult> {
    let size = usize::try_from(size).unwrap_or(usize::MAX);
    let errors = rules
        .iter()
        .filter(|rule| options.tags.is_empty() || rule.has_any_tag(&options.tags))
        .map(|rule| {
            let error = rule.check_size(size).err()?;
            Some(RuleFailure {
                rule: rule.name().to_string(),
                error,
            })
        })
        .collect::<Option<Vec<_>>>()?;
    if errors.is_empty() {
        return None;
    }

    for failure in &errors {
        warn!(file = %filepath, rule = %failure.rule, error = %failure.error, "Rule failed");
    }
    Some(ExecutionResult {
        file: filepath.to_string(),
        rules_applied: errors.len(),
        errors,
        ..ExecutionResult::default()
    })
}

/// Highest confidence across files; ties keep the earlier file.
pub fn overall_best(files: &[ExecutionResult]) -> Option<BestVersion> {
    let mut best: Option<(&str, &ExtractionResult)> = None;
    for file in files {
        if let Some(candidate) = &file.best_result
            && best.is_none_or(|(_, current)| candidate.confidence > current.confidence)
        {
            best = Some((file.file.as_str(), candidate));
        }
    }
    best.map(|(file, result)| BestVersion {
        file: file.to_string(),
        result: result.clone(),
    })
}

impl ScanReport {
    /// Human-readable rendering.
    pub fn render(&self, mode: Mode) -> String {
        let mut out = String::new();
        for file in &self.files {
            if !file.found() && !file.has_errors() {
                continue;
            }
            let _ = writeln!(out, "{}", file.file);
            let shown: Vec<&ExtractionResult> = match mode {
                Mode::Best => file.best_result.iter().collect(),
                Mode::All | Mode::First => file.results.iter().collect(),
            };
            for result in shown {
                let kind = result.metadata.get(META_KIND).map_or("", String::as_str);
                let _ = writeln!(
                    out,
                    "  {:<16} confidence {:.2}  {kind}",
                    result.value, result.confidence
                );
            }
            for failure in &file.errors {
                let _ = writeln!(out, "  error: {}", failure.error);
            }
        }
        for failed in &self.unreadable {
            let _ = writeln!(out, "{}\n  error: {}", failed.file, failed.error);
        }

        match &self.best {
            Some(best) => {
                let _ = writeln!(
                    out,
                    "Python {} (from {}, confidence {:.2})",
                    best.result.value, best.file, best.result.confidence
                );
            }
            None => {
                let _ = writeln!(out, "No Python version found in {} files", self.examined);
            }
        }
        if !self.unreadable.is_empty() {
            let _ = writeln!(out, "{} matched files could not be read", self.unreadable.len());
        }
        if self.cancelled {
            let _ = writeln!(out, "Scan cancelled; results are partial");
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use pyver_core::{RuleError, RuleRegistry, builtin_registry};
    use pyver_test_utils::fixtures::fixed_extractor;
    use std::path::Path;
    use tempfile::TempDir;

    async fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.unwrap();
        }
        tokio::fs::write(path, content).await.unwrap();
    }

    async fn project() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(root, ".python-version", "3.12.2\n").await;
        write(root, "pyproject.toml", "[project]\nrequires-python = \">=3.10\"\n").await;
        write(root, "README.md", "# demo\n").await;
        write(root, "docker/Dockerfile", "FROM python:3.11-slim\n").await;
        write(root, "docker/nested/deeper/tox.ini", "[tox]\nenvlist = py313\n").await;
        write(root, "node_modules/pkg/.python-version", "2.7.18\n").await;
        dir
    }

    fn relative(root: &Path, files: &[PathBuf]) -> Vec<String> {
        files
            .iter()
            .map(|f| f.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect()
    }

    #[tokio::test]
    async fn test_collect_files_honours_depth_and_ignores() {
        let dir = project().await;
        let ignore = vec!["node_modules".to_string()];
        let walk = WalkOptions {
            max_depth: 2,
            ignore_dirs: &ignore,
        };

        let files = collect_files(&[dir.path().to_path_buf()], &walk).await.unwrap();
        assert_eq!(
            relative(dir.path(), &files),
            vec![".python-version", "README.md", "docker/Dockerfile", "pyproject.toml"]
        );
    }

    #[tokio::test]
    async fn test_collect_files_accepts_file_roots() {
        let dir = project().await;
        let file = dir.path().join("pyproject.toml");
        let walk = WalkOptions {
            max_depth: 1,
            ignore_dirs: &[],
        };
        let files = collect_files(&[file.clone(), file.clone()], &walk).await.unwrap();
        assert_eq!(files, vec![file]);

        let missing = dir.path().join("missing");
        assert!(collect_files(&[missing], &walk).await.is_err());
    }

    #[cfg(unix)]
    #[test_log::test(tokio::test)]
    async fn test_collect_files_follows_file_symlinks_only() {
        use std::os::unix::fs::symlink;

        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(root, "shared/.python-version", "3.12.2\n").await;
        write(root, "shared/nested/runtime.txt", "python-3.11.9\n").await;
        tokio::fs::create_dir(root.join("proj")).await.unwrap();
        symlink("../shared/.python-version", root.join("proj/.python-version")).unwrap();
        symlink("../shared", root.join("proj/linked")).unwrap();

        let proj = root.join("proj");
        let walk = WalkOptions {
            max_depth: 4,
            ignore_dirs: &[],
        };
        let files = collect_files(&[proj.clone()], &walk).await.unwrap();
        assert_eq!(files, vec![proj.join(".python-version")]);

        let engine = Engine::new(Arc::new(builtin_registry()));
        let report =
            scan_files(&engine, files, ExecutionOptions::default(), 1, &CancelToken::new()).await;
        assert_eq!(report.best.unwrap().result.value, "3.12.2");
    }

    #[test_log::test(tokio::test)]
    async fn test_unreadable_file_is_reported() {
        let dir = project().await;
        let missing = dir.path().join("gone/.python-version");
        let files = vec![dir.path().join("pyproject.toml"), missing.clone()];
        let engine = Engine::new(Arc::new(builtin_registry()));

        let report =
            scan_files(&engine, files, ExecutionOptions::default(), 2, &CancelToken::new()).await;

        assert_eq!(report.files.len(), 1);
        assert_eq!(report.unreadable.len(), 1);
        assert_eq!(report.unreadable[0].file, missing.to_string_lossy());

        let text = report.render(Mode::All);
        assert!(text.contains(&format!("{}\n  error: ", missing.display())), "{text}");
        assert!(text.ends_with("1 matched files could not be read\n"), "{text}");
    }

    #[test_log::test(tokio::test)]
    async fn test_oversized_file_fails_without_reading() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "setup.cfg", &"x".repeat(64)).await;
        let registry = RuleRegistry::new();
        registry.must_register(
            Rule::builder("tiny")
                .file_pattern("*.cfg")
                .max_file_size(8)
                .extractor(fixed_extractor("3.12", 1.0))
                .build()
                .unwrap(),
        );
        let engine = Engine::new(Arc::new(registry));

        let report = scan_files(
            &engine,
            vec![dir.path().join("setup.cfg")],
            ExecutionOptions::default(),
            1,
            &CancelToken::new(),
        )
        .await;

        let file = &report.files[0];
        assert!(!file.found());
        assert_eq!(file.rules_applied, 1);
        assert!(matches!(
            file.errors[0].error,
            RuleError::SizeExceeded { size: 64, limit: 8, .. }
        ));
        assert!(report.unreadable.is_empty());
    }

    #[test]
    fn test_reject_oversized_needs_every_rule_over_cap() {
        let rule = |name: &str, cap: usize, tag: &str| {
            Rule::builder(name)
                .file_pattern("*")
                .max_file_size(cap)
                .tags([tag])
                .extractor(fixed_extractor("3.12", 1.0))
                .build()
                .unwrap()
        };
        let rules = vec![rule("small", 8, "pinned"), rule("unlimited", 0, "ci")];
        let options = ExecutionOptions::default();

        assert!(reject_oversized(&rules, &options, 64, "/p/f").is_none());
        assert!(reject_oversized(&rules[..1], &options, 8, "/p/f").is_none());

        let rejected = reject_oversized(&rules, &options.tag("pinned"), 64, "/p/f").unwrap();
        assert_eq!(rejected.file, "/p/f");
        assert_eq!(rejected.errors.len(), 1);
        assert_eq!(rejected.errors[0].rule, "small");

        let none_selected = ExecutionOptions::default().tag("docs");
        assert!(reject_oversized(&rules, &none_selected, 64, "/p/f").is_none());
    }

    #[tokio::test]
    async fn test_scan_reports_best_version() {
        let dir = project().await;
        let walk = WalkOptions {
            max_depth: 8,
            ignore_dirs: &[],
        };
        let files = collect_files(&[dir.path().to_path_buf()], &walk).await.unwrap();
        let engine = Engine::new(Arc::new(builtin_registry()));

        let report = scan_files(
            &engine,
            files,
            ExecutionOptions::default(),
            2,
            &CancelToken::new(),
        )
        .await;

        assert_eq!(report.examined, 6);
        assert_eq!(report.files.len(), 5);
        assert!(!report.cancelled);
        let best = report.best.unwrap();
        assert_eq!(best.result.value, "3.12.2");
        assert!(best.file.ends_with(".python-version"));
    }

    #[tokio::test]
    async fn test_cancelled_scan_starts_nothing() {
        let dir = project().await;
        let files = vec![dir.path().join(".python-version")];
        let engine = Engine::new(Arc::new(builtin_registry()));
        let cancel = CancelToken::new();
        cancel.cancel();

        let report = scan_files(&engine, files, ExecutionOptions::default(), 4, &cancel).await;
        assert!(report.cancelled);
        assert!(report.files.is_empty());
        assert!(report.render(Mode::All).contains("results are partial"));
    }

    #[test]
    fn test_mode_overrides() {
        let base = ExecutionOptions::default().max_results(5).min_confidence(0.4);
        let first = Mode::First.apply(base.clone());
        assert!(first.stop_on_first_match);
        assert_eq!(first.max_results, 1);
        assert_eq!(first.min_confidence, 0.4);

        let best = Mode::Best.apply(base.clone().stop_on_first_match(true));
        assert!(!best.stop_on_first_match);
        assert_eq!(best.max_results, 0);

        assert_eq!(Mode::All.apply(base.clone()), base);
    }

    #[test]
    fn test_overall_best_prefers_confidence_then_order() {
        let file = |path: &str, value: &str, confidence: f64| ExecutionResult {
            file: path.to_string(),
            best_result: Some(ExtractionResult::found(value, confidence)),
            ..ExecutionResult::default()
        };
        let files = vec![
            file("/a/setup.cfg", ">=3.8", 0.75),
            file("/a/Dockerfile", "3.11", 0.8),
            file("/b/Dockerfile", "3.12", 0.8),
            ExecutionResult::default(),
        ];
        let best = overall_best(&files).unwrap();
        assert_eq!(best.file, "/a/Dockerfile");
        assert_eq!(best.result.value, "3.11");

        assert!(overall_best(&[]).is_none());
    }

    #[test]
    fn test_render_lists_results_and_errors() {
        let report = ScanReport {
            examined: 3,
            files: vec![ExecutionResult {
                file: "/p/runtime.txt".to_string(),
                results: vec![ExtractionResult::found("3.10.4", 0.95).with_metadata("kind", "pinned")],
                best_result: Some(ExtractionResult::found("3.10.4", 0.95)),
                ..ExecutionResult::default()
            }],
            best: Some(BestVersion {
                file: "/p/runtime.txt".to_string(),
                result: ExtractionResult::found("3.10.4", 0.95),
            }),
            unreadable: Vec::new(),
            cancelled: false,
        };
        let text = report.render(Mode::All);
        assert!(text.starts_with("/p/runtime.txt\n  3.10.4"));
        assert!(text.contains("confidence 0.95  pinned"));
        assert!(text.ends_with("Python 3.10.4 (from /p/runtime.txt, confidence 0.95)\n"));

        let empty = ScanReport {
            examined: 3,
            ..ScanReport::default()
        };
        assert_eq!(empty.render(Mode::Best), "No Python version found in 3 files\n");
    }
}
