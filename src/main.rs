//! IndexPulse CLI entry point

use anyhow::{bail, Context, Result};
use indexpulse::config::cli::Cli;
use indexpulse::config::{toml::build_config, validator::validate_config};
use indexpulse::output::text::{print_configuration, print_summary};
use indexpulse::worker::runner::run_load_test;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("IndexPulse v{}", env!("CARGO_PKG_VERSION"));
    println!("Synthetic document load generator");
    println!();

    let cli = Cli::parse_args();
    cli.validate()?;

    let config = build_config(&cli)?;
    validate_config(&config).context("Configuration validation failed")?;

    print_configuration(&config);
    println!();

    if cli.dry_run {
        println!("Dry run: configuration is valid, no documents sent.");
        return Ok(());
    }

    let summary = run_load_test(Arc::new(config))?;
    print_summary(&summary);

    if !summary.is_success() {
        let failed = summary.failed_workers().len();
        match &summary.commit_error {
            Some(err) if failed == 0 => bail!("Final commit failed: {}", err),
            _ => bail!("{} of {} workers failed", failed, summary.workers.len()),
        }
    }

    Ok(())
}
