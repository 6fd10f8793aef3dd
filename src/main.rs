// Command-line entry point for invoke-link.

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use invoke_link::application::{AnalyzeUsecase, InvokeLinkService};
use invoke_link::domain::cycle_guard::CycleGuardKind;
use invoke_link::domain::impact::ChangeSet;
use invoke_link::infrastructure::config::AnalyzerConfig;
use invoke_link::infrastructure::export::{DotExporter, JsonExporter};
use invoke_link::infrastructure::git_diff::{changes_from_listing, GitDiffProvider};
use invoke_link::ports::{DiffProvider, ForestExporter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Json,
    Dot,
}

/// Build HTTP and RPC entry-point call trees from compiled JVM classes.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Class output directories (e.g. target/classes), one per module
    #[arg(required = true)]
    roots: Vec<PathBuf>,

    /// Ant-style exclusion pattern (repeatable; an artifact must match all of them)
    #[arg(short, long = "exclude")]
    exclude: Vec<String>,

    /// TOML settings file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// File listing changed source paths, one per line; keeps only impacted entry points
    #[arg(long, conflicts_with = "base")]
    changed: Option<PathBuf>,

    /// Base revision to diff against; keeps only impacted entry points
    #[arg(long, requires = "head")]
    base: Option<String>,

    /// Head revision for --base
    #[arg(long, requires = "base")]
    head: Option<String>,

    /// Repository for --base/--head
    #[arg(long, default_value = ".")]
    repo: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: Format,

    /// Output file path (stdout when omitted)
    #[arg(short, long)]
    output: Option<String>,

    /// Extraction threads (overrides the config file)
    #[arg(long)]
    workers: Option<usize>,

    /// Cycle guard: serialized or ancestor (overrides the config file)
    #[arg(long)]
    cycle_guard: Option<CycleGuardKind>,

    /// Maximum call tree depth (overrides the config file)
    #[arg(long)]
    max_depth: Option<usize>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn load_config(cli: &Cli) -> Result<AnalyzerConfig> {
    let mut config = match &cli.config {
        Some(path) => AnalyzerConfig::load(path)?,
        None => AnalyzerConfig::default(),
    };
    if cli.workers.is_some() {
        config.workers = cli.workers;
    }
    if let Some(guard) = cli.cycle_guard {
        config.cycle_guard = guard;
    }
    if let Some(depth) = cli.max_depth {
        if depth == 0 {
            bail!("--max-depth must be at least 1");
        }
        config.max_depth = depth;
    }
    Ok(config)
}

fn load_changes(cli: &Cli) -> Result<Option<ChangeSet>> {
    if let Some(path) = &cli.changed {
        let listing = fs::read_to_string(path)
            .with_context(|| format!("Cannot read change list {}", path.display()))?;
        return Ok(Some(changes_from_listing(&listing)));
    }
    match (&cli.base, &cli.head) {
        (Some(base), Some(head)) => {
            let provider = GitDiffProvider::new(&cli.repo);
            Ok(Some(provider.changed_classes(base, head)?))
        }
        _ => Ok(None),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log_level))
        .context("Invalid --log-level")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(&cli)?;
    let changes = load_changes(&cli)?;

    let exporter: &dyn ForestExporter = match cli.format {
        Format::Json => &JsonExporter,
        Format::Dot => &DotExporter,
    };
    let service = InvokeLinkService::new(config);
    let usecase = AnalyzeUsecase {
        service: &service,
        exporter,
    };

    let report = usecase.run(cli.roots.as_slice(), &cli.exclude, changes.as_ref(), cli.output.as_deref())?;

    match &cli.output {
        Some(path) => info!(
            "Analysis completed! {} HTTP and {} RPC entry points written to {}",
            report.forest.http.len(),
            report.forest.rpc.len(),
            path
        ),
        None => println!("{}", usecase.render(&report.forest)?),
    }
    info!(
        "{} artifacts scanned, {} excluded, {} failed, {} methods",
        report.stats.artifacts, report.stats.excluded, report.stats.failed, report.stats.records
    );
    Ok(())
}
