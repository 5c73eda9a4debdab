//! CLI argument parsing using clap

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Backend flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EndpointKind {
    /// Clustered backend update API
    Solrcloud,
    /// HTTP ingestion pipeline
    Pipeline,
}

/// IndexPulse - synthetic document ingestion load driver
#[derive(Parser, Debug, Default)]
#[command(name = "indexpulse")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// TOML configuration file (command-line flags override it)
    #[arg(short = 'c', long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    // === Endpoint Options ===
    /// Backend to send batches to
    #[arg(long, value_enum)]
    pub endpoint: Option<EndpointKind>,

    /// Target collection
    #[arg(long)]
    pub collection: Option<String>,

    /// Comma-separated cluster node base URLs (solrcloud endpoint)
    #[arg(long, env = "INDEXPULSE_SOLR_URLS", value_delimiter = ',')]
    pub solr_urls: Vec<String>,

    /// Ingestion pipeline URL; `${collection}` is substituted (pipeline endpoint)
    #[arg(long, env = "INDEXPULSE_PIPELINE_URL")]
    pub pipeline_url: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long)]
    pub request_timeout: Option<u64>,

    // === Workload Options ===
    /// Number of parallel workers
    #[arg(short = 't', long)]
    pub workers: Option<usize>,

    /// Documents per batch
    #[arg(short = 'b', long)]
    pub batch_size: Option<usize>,

    /// Documents generated by each worker
    #[arg(short = 'n', long)]
    pub docs_per_worker: Option<usize>,

    /// Prefix for generated document ids
    #[arg(long)]
    pub id_prefix: Option<String>,

    /// Base random seed
    #[arg(long)]
    pub random_seed: Option<u64>,

    /// Word list file (one word per line)
    #[arg(short = 'w', long)]
    pub word_list: Option<PathBuf>,

    /// Skip the final commit after the last worker finishes
    #[arg(long)]
    pub no_commit: bool,

    // === Retry Options ===
    /// Seconds to wait before retrying a batch after a transport failure
    #[arg(long)]
    pub retry_wait: Option<u64>,

    /// Attempt budget for a batch hitting transport failures
    #[arg(long)]
    pub max_retries: Option<u32>,

    // === Output Options ===
    /// Seconds between periodic throughput reports
    #[arg(long)]
    pub report_interval: Option<u64>,

    /// Validate and print the configuration without sending anything
    #[arg(long)]
    pub dry_run: bool,
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate CLI arguments that cannot be checked after merging
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.workers == Some(0) {
            anyhow::bail!("workers must be at least 1");
        }
        if self.batch_size == Some(0) {
            anyhow::bail!("batch_size must be at least 1");
        }
        if self.report_interval == Some(0) {
            anyhow::bail!("report_interval must be at least 1 second");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flags() {
        let cli = Cli::try_parse_from([
            "indexpulse",
            "--endpoint", "solrcloud",
            "--solr-urls", "http://a:8983,http://b:8983",
            "-t", "4",
            "-b", "250",
            "--no-commit",
        ])
        .unwrap();

        assert_eq!(cli.endpoint, Some(EndpointKind::Solrcloud));
        assert_eq!(cli.solr_urls, vec!["http://a:8983", "http://b:8983"]);
        assert_eq!(cli.workers, Some(4));
        assert_eq!(cli.batch_size, Some(250));
        assert!(cli.no_commit);
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_workers() {
        let cli = Cli::try_parse_from(["indexpulse", "--workers", "0"]).unwrap();
        assert!(cli.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_batch() {
        let cli = Cli::try_parse_from(["indexpulse", "--batch-size", "0"]).unwrap();
        assert!(cli.validate().is_err());
    }
}
