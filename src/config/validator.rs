//! Configuration validation

use super::*;
use anyhow::{Context, Result};

/// Validate complete configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_workload(&config.workload)?;
    validate_endpoint(&config.endpoint)?;
    validate_reporting(&config.reporting)?;
    validate_fields(config)?;

    Ok(())
}

/// Validate workload configuration
pub fn validate_workload(workload: &WorkloadConfig) -> Result<()> {
    if workload.workers == 0 {
        anyhow::bail!("workload.workers must be at least 1");
    }

    if workload.batch_size == 0 {
        anyhow::bail!("workload.batch_size must be at least 1");
    }

    if workload.docs_per_worker < workload.batch_size {
        tracing::warn!(
            docs_per_worker = workload.docs_per_worker,
            batch_size = workload.batch_size,
            "docs_per_worker is smaller than one batch, raising it to batch_size"
        );
    }

    if workload.workers > 1024 {
        tracing::warn!(
            workers = workload.workers,
            "very high worker count, the endpoint may become the bottleneck"
        );
    }

    Ok(())
}

/// Validate endpoint configuration
pub fn validate_endpoint(endpoint: &EndpointConfig) -> Result<()> {
    if endpoint.collection.trim().is_empty() {
        return Err(ConfigError::MissingParameter("collection".to_string()).into());
    }

    match endpoint.endpoint_type {
        EndpointType::Solrcloud => {
            if endpoint.solr_urls.iter().all(|url| url.trim().is_empty()) {
                return Err(ConfigError::MissingParameter("solr_urls".to_string()).into());
            }
        }
        EndpointType::Pipeline => {
            if endpoint.pipeline_url.trim().is_empty() {
                return Err(ConfigError::MissingParameter("pipeline_url".to_string()).into());
            }
        }
    }

    if endpoint.request_timeout_secs == 0 {
        anyhow::bail!("endpoint.request_timeout_secs must be greater than 0");
    }

    Ok(())
}

/// Validate reporting configuration
pub fn validate_reporting(reporting: &ReportingConfig) -> Result<()> {
    if reporting.interval_secs == 0 {
        anyhow::bail!("reporting.interval_secs must be greater than 0");
    }

    Ok(())
}

/// Every field spec must parse before any worker starts
fn validate_fields(config: &Config) -> Result<()> {
    if config.fields.is_empty() {
        anyhow::bail!("at least one field must be configured");
    }

    for (i, field) in config.fields.iter().enumerate() {
        FieldDefinition::parse(&field.name, &field.spec, field.words)
            .with_context(|| format!("Field {} ({})", i, field.name))?;
    }

    Ok(())
}
