//! Nimbus CLI
//!
//! Audits a cloud project's configuration against the posture check catalogue.

mod commands;

use clap::{Parser, Subcommand};
use nimbus_core::Config;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Nimbus - cloud security posture auditor
#[derive(Parser)]
#[command(name = "nimbus")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (YAML or JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Audit commands
    #[command(subcommand)]
    Audit(commands::audit::AuditCommands),

    /// Show the configuration in effect
    Info,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    }
    .apply_env();

    // Initialize logging
    let filter = if cli.verbose || config.general.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();

    match cli.command {
        Commands::Audit(cmd) => commands::audit::run(cmd, config),
        Commands::Info => commands::info::run(&config),
    }
}
