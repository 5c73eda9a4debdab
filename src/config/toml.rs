//! TOML configuration file parsing

use super::*;
use crate::config::cli::{Cli, EndpointKind};
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Parse TOML configuration file
pub fn parse_toml_file(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_toml_string(&contents)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse TOML configuration from string
pub fn parse_toml_string(contents: &str) -> Result<Config> {
    let config: Config = ::toml::from_str(contents)
        .context("Failed to parse TOML configuration")?;

    Ok(config)
}

/// Build the effective configuration: TOML file if given, then CLI overrides
pub fn build_config(cli: &Cli) -> Result<Config> {
    let config = match &cli.config {
        Some(path) => parse_toml_file(path)?,
        None => Config::default(),
    };
    merge_cli_with_config(cli, config)
}

/// Merge CLI arguments with TOML configuration (CLI takes precedence)
pub fn merge_cli_with_config(cli: &Cli, mut config: Config) -> Result<Config> {
    // Endpoint
    if let Some(kind) = cli.endpoint {
        config.endpoint.endpoint_type = match kind {
            EndpointKind::Solrcloud => EndpointType::Solrcloud,
            EndpointKind::Pipeline => EndpointType::Pipeline,
        };
    }
    if let Some(ref collection) = cli.collection {
        config.endpoint.collection = collection.clone();
    }
    if !cli.solr_urls.is_empty() {
        config.endpoint.solr_urls = cli
            .solr_urls
            .iter()
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .collect();
    }
    if let Some(ref url) = cli.pipeline_url {
        config.endpoint.pipeline_url = url.clone();
    }
    if let Some(timeout) = cli.request_timeout {
        config.endpoint.request_timeout_secs = timeout;
    }

    // Workload
    if let Some(workers) = cli.workers {
        config.workload.workers = workers;
    }
    if let Some(batch_size) = cli.batch_size {
        config.workload.batch_size = batch_size;
    }
    if let Some(docs) = cli.docs_per_worker {
        config.workload.docs_per_worker = docs;
    }
    if let Some(ref prefix) = cli.id_prefix {
        config.workload.id_prefix = prefix.clone();
    }
    if let Some(seed) = cli.random_seed {
        config.workload.random_seed = seed;
    }
    if let Some(ref word_list) = cli.word_list {
        config.workload.word_list = word_list.clone();
    }
    if cli.no_commit {
        config.workload.commit_at_end = false;
    }

    // Retry
    if let Some(wait) = cli.retry_wait {
        config.retry.wait_secs = wait;
    }
    if let Some(max) = cli.max_retries {
        config.retry.max_retries = max;
    }

    // Reporting
    if let Some(interval) = cli.report_interval {
        config.reporting.interval_secs = interval;
    }

    Ok(config)
}
