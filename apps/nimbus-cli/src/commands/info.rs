//! Configuration information command

use nimbus_core::{Config, PROJECT_ENV_VAR};

pub fn run(config: &Config) -> anyhow::Result<()> {
    println!("Nimbus Configuration");
    println!("====================\n");

    match &config.general.project_id {
        Some(project) => println!("Project: {}", project),
        None => println!("Project: (not set, use `audit run --project` or {})", PROJECT_ENV_VAR),
    }
    println!("Output format: {}", config.general.output_format);

    println!("\nEngine:");
    println!("  - Parallel: {}", if config.engine.parallel { "Yes" } else { "No" });
    println!("  - Max workers: {}", config.engine.max_workers);
    match config.engine.check_timeout() {
        Some(timeout) => println!("  - Check timeout: {}s", timeout.as_secs()),
        None => println!("  - Check timeout: disabled"),
    }

    println!("\nExport:");
    println!(
        "  - Degraded checks: {}",
        if config.export.include_degraded { "included" } else { "omitted" }
    );
    if let Some(dir) = &config.export.directory {
        println!("  - Directory: {}", dir.display());
    }

    if !config.checks.skip.is_empty() {
        println!("\nSkipped checks: {}", config.checks.skip.join(", "));
    }

    Ok(())
}
