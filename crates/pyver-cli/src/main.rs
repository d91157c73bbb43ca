#![deny(unsafe_code)]

//! pyver CLI: detect the Python version a project targets.

mod scan;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use pyver_config::AppConfig;
use pyver_core::{CancelToken, Engine, ExecutionOptions, registry_from_config};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use scan::{Mode, WalkOptions};

/// pyver: find the Python version a project declares.
#[derive(Parser)]
#[command(name = "pyver", version, about, long_about = None)]
struct Cli {
    /// Path to configuration file.
    #[arg(short, long, default_value = "pyver.toml")]
    config: PathBuf,

    /// Increase log verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan files and directories for Python version declarations.
    Scan(ScanArgs),

    /// List the loaded rules.
    Rules {
        /// Include disabled rules.
        #[arg(long)]
        all: bool,

        /// Print registry statistics instead of the rule list.
        #[arg(long)]
        stats: bool,

        /// Print JSON.
        #[arg(long)]
        json: bool,
    },

    /// Validate and display configuration.
    Config {
        /// Show the resolved configuration.
        #[arg(long)]
        show: bool,
    },

    /// Show build information.
    Version {
        /// Print JSON.
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
struct ScanArgs {
    /// Files or directories to scan.
    #[arg(default_value = ".")]
    paths: Vec<PathBuf>,

    /// Which results to report per file.
    #[arg(long, value_enum, default_value_t = Mode::All)]
    mode: Mode,

    /// Discard results below this confidence.
    #[arg(long)]
    min_confidence: Option<f64>,

    /// Stop after this many results per file (0 = unlimited).
    #[arg(long)]
    max_results: Option<usize>,

    /// Only run rules with this tag (repeatable).
    #[arg(long = "tag")]
    tags: Vec<String>,

    /// Print JSON.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = read_config(&cli.config).await?;
    let level = match cli.verbose {
        0 => loaded.as_ref().map_or("info", |c| c.logging.level.as_str()),
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();

    let config = loaded.unwrap_or_else(|| {
        info!(path = %cli.config.display(), "Config file not found, using defaults");
        AppConfig::default()
    });

    match cli.command {
        Commands::Scan(args) => cmd_scan(&config, args).await?,
        Commands::Rules { all, stats, json } => cmd_rules(&config, all, stats, json)?,
        Commands::Config { show } => cmd_config(&cli.config, &config, show)?,
        Commands::Version { json } => cmd_version(json)?,
    }

    Ok(())
}

async fn cmd_scan(config: &AppConfig, args: ScanArgs) -> Result<()> {
    let options = scan_options(config, &args)?;
    let engine = Engine::new(Arc::new(registry_from_config(config)?));

    let cancel = CancelToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, cancelling scan");
                cancel.cancel();
            }
        })
    };

    let walk = WalkOptions {
        max_depth: config.scan.max_depth,
        ignore_dirs: &config.scan.ignore_dirs,
    };
    let files = scan::collect_files(&args.paths, &walk).await?;
    info!(files = files.len(), rules = engine.registry().len(), "Scanning");

    let report =
        scan::scan_files(&engine, files, options, config.scan.concurrency, &cancel).await;
    interrupt.abort();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report.render(args.mode));
    }
    Ok(())
}

/// `[execution]` settings with command-line overrides applied.
fn scan_options(config: &AppConfig, args: &ScanArgs) -> Result<ExecutionOptions> {
    let mut options = ExecutionOptions::from(&config.execution);
    if let Some(min) = args.min_confidence {
        if !(0.0..=1.0).contains(&min) {
            bail!("--min-confidence must be in [0.0, 1.0], got {min}");
        }
        options = options.min_confidence(min);
    }
    if let Some(max) = args.max_results {
        options = options.max_results(max);
    }
    if !args.tags.is_empty() {
        options.tags = args.tags.clone();
    }
    Ok(args.mode.apply(options))
}

fn cmd_rules(config: &AppConfig, all: bool, stats: bool, json: bool) -> Result<()> {
    let registry = registry_from_config(config)?;

    if stats {
        let stats = registry.statistics();
        if json {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        } else {
            println!("{} rules ({} enabled, {} disabled)", stats.total, stats.enabled, stats.disabled);
            for (tag, count) in &stats.by_tag {
                println!("  {tag:<12} {count}");
            }
        }
        return Ok(());
    }

    let rules = if all {
        registry.list()
    } else {
        registry.list_enabled()
    };
    if json {
        let listing: Vec<serde_json::Value> = rules
            .iter()
            .map(|rule| {
                serde_json::json!({
                    "name": rule.name(),
                    "description": rule.description(),
                    "priority": rule.priority(),
                    "file_pattern": rule.condition().file_pattern(),
                    "path_pattern": rule.condition().path_pattern().map(|re| re.as_str()),
                    "required_content": rule.condition().required_content().map(|re| re.as_str()),
                    "max_file_size": rule.condition().max_file_size(),
                    "tags": rule.tags(),
                    "enabled": rule.is_enabled(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }

    for rule in &rules {
        let state = if rule.is_enabled() { "" } else { "  (disabled)" };
        println!(
            "{:>4}  {:<28} {:<18} {}{state}",
            rule.priority(),
            rule.name(),
            rule.condition().file_pattern(),
            rule.tags().join(",")
        );
    }
    Ok(())
}

fn cmd_config(config_path: &Path, config: &AppConfig, show: bool) -> Result<()> {
    let registry = registry_from_config(config)
        .with_context(|| format!("rules in '{}' are invalid", config_path.display()))?;
    if show {
        let toml_str = toml::to_string_pretty(config).context("failed to serialize config")?;
        println!("{toml_str}");
    } else {
        println!(
            "Configuration at '{}' is valid ({} rules).",
            config_path.display(),
            registry.len()
        );
    }
    Ok(())
}

fn cmd_version(json: bool) -> Result<()> {
    if json {
        let info = pyver_core::build_info::BuildInfo::CURRENT;
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        println!("pyver {}", pyver_core::build_info::version_string());
    }
    Ok(())
}

/// Load the config file, or `None` when it does not exist.
async fn read_config(path: &Path) -> Result<Option<AppConfig>> {
    if !tokio::fs::try_exists(path).await.unwrap_or(false) {
        return Ok(None);
    }
    let config = AppConfig::load(path)
        .await
        .with_context(|| format!("failed to load config '{}'", path.display()))?;
    Ok(Some(config))
}
