//! Audit commands

use anyhow::Context;
use clap::{Args, Subcommand, ValueEnum};
use nimbus_checks::{default_registry, InventoryProvider};
use nimbus_core::{AuditSnapshot, CheckResult, Config, OutputFormat, ProgressReporter};
use nimbus_engine::{
    format_json, format_text, ExportFormat, ExportOptions, OrchestratorBuilder, ReportExporter,
};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Subcommand)]
pub enum AuditCommands {
    /// Run every check against an inventory and report the results
    Run(RunArgs),

    /// List the registered checks in reporting order
    Checks(ChecksArgs),
}

/// Output format for audit results
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Format {
    /// Human-readable summary
    Text,
    /// Snapshot as JSON
    Json,
    /// Timestamped CSV file written to the output directory
    Csv,
}

impl From<OutputFormat> for Format {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Text => Format::Text,
            OutputFormat::Json => Format::Json,
            OutputFormat::Csv => Format::Csv,
        }
    }
}

#[derive(Args)]
pub struct RunArgs {
    /// Inventory snapshot to audit (YAML or JSON)
    #[arg(short, long)]
    inventory: PathBuf,

    /// Project ID, overrides the inventory and configuration
    #[arg(short, long)]
    project: Option<String>,

    /// Run checks one after another
    #[arg(long)]
    sequential: bool,

    /// Maximum number of checks running at once
    #[arg(long)]
    workers: Option<usize>,

    /// Per-check timeout in seconds (0 disables)
    #[arg(long)]
    timeout: Option<u64>,

    /// Output format (defaults to the configured format)
    #[arg(short, long, value_enum)]
    format: Option<Format>,

    /// Directory for the CSV export
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Export a row for checks that only produced a note
    #[arg(long)]
    include_degraded: bool,

    /// List every resource in text output
    #[arg(long)]
    show_resources: bool,

    /// Checks to skip
    #[arg(long, value_delimiter = ',')]
    skip: Vec<String>,
}

#[derive(Args)]
pub struct ChecksArgs {
    /// Print the catalogue as JSON
    #[arg(long)]
    json: bool,
}

/// Logs each finished check
struct LogProgress;

impl ProgressReporter for LogProgress {
    fn run_started(&self, total: usize) {
        info!("Running {} checks", total);
    }

    fn check_finished(&self, _index: usize, result: &CheckResult, completed: usize, total: usize) {
        if result.is_degraded() {
            info!(
                "[{}/{}] {}: {} ({})",
                completed,
                total,
                result.category,
                result.check_name,
                result.notes
            );
        } else {
            info!(
                "[{}/{}] {}: {} - {} resources",
                completed,
                total,
                result.category,
                result.check_name,
                result.resources.len()
            );
        }
    }

    fn run_completed(&self, _snapshot: &AuditSnapshot) {}
}

pub fn run(cmd: AuditCommands, config: Config) -> anyhow::Result<()> {
    match cmd {
        AuditCommands::Run(args) => run_audit(args, config),
        AuditCommands::Checks(args) => list_checks(args, &config),
    }
}

fn run_audit(args: RunArgs, config: Config) -> anyhow::Result<()> {
    let mut provider = InventoryProvider::from_file(&args.inventory)
        .with_context(|| format!("loading inventory {}", args.inventory.display()))?;
    if let Some(project) = args.project.or(config.general.project_id.clone()) {
        provider = provider.with_project_id(project);
    }

    let mut engine = config.engine.clone();
    if args.sequential {
        engine.parallel = false;
    }
    if let Some(workers) = args.workers {
        engine.max_workers = workers.max(1);
    }
    if let Some(timeout) = args.timeout {
        engine.check_timeout_secs = timeout;
    }

    let mut skip = config.checks.skip.clone();
    skip.extend(args.skip);

    let orchestrator = OrchestratorBuilder::new(default_registry())
        .config(engine)
        .skip(skip)
        .progress(Arc::new(LogProgress))
        .build(Arc::new(provider));

    let handle = orchestrator
        .start_audit()
        .context("an audit is already running")?;
    let snapshot = handle.wait();

    let format = match args.format {
        Some(format) => format,
        None => config
            .general
            .output_format
            .parse::<OutputFormat>()
            .map_err(|e| anyhow::anyhow!(e))?
            .into(),
    };

    let exporter = ReportExporter::new(ExportOptions {
        include_degraded: args.include_degraded || config.export.include_degraded,
    });

    match format {
        Format::Text => println!("{}", format_text(&snapshot, args.show_resources)),
        Format::Json => println!("{}", format_json(&snapshot, true)?),
        Format::Csv => {
            let dir = args
                .output
                .or(config.export.directory)
                .unwrap_or_else(|| PathBuf::from("."));
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("creating {}", dir.display()))?;

            let path = exporter.write_file(
                &snapshot.filled_results(),
                &dir,
                ExportFormat::Csv,
                chrono::Utc::now(),
            )?;
            println!("Report written to {}", path.display());
        }
    }

    Ok(())
}

fn list_checks(args: ChecksArgs, config: &Config) -> anyhow::Result<()> {
    let registry = default_registry().without(&config.checks.skip);

    if args.json {
        let checks: Vec<_> = registry
            .checks()
            .iter()
            .enumerate()
            .map(|(index, check)| {
                json!({
                    "index": index,
                    "id": check.id(),
                    "name": check.name(),
                    "category": check.category(),
                    "description": check.description(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&checks)?);
        return Ok(());
    }

    println!("Registered Checks");
    println!("=================\n");
    for (index, check) in registry.checks().iter().enumerate() {
        println!("{:>2}. {} [{}]", index, check.name(), check.id());
        println!("    Category: {}", check.category());
        println!("    {}", check.description());
    }
    println!("\nTotal: {} checks", registry.len());

    Ok(())
}
