//! Configuration module
//!
//! Handles CLI argument parsing, TOML configuration files, and validation.
//! Defaults mirror the reference load-test deployment: batches of 100,
//! 10,000 documents per worker, a 10 second retry wait and 3 attempts.

pub mod cli;
pub mod toml;
pub mod validator;

use crate::field::FieldDefinition;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Placeholder in the pipeline URL replaced by the collection name
pub const COLLECTION_PLACEHOLDER: &str = "${collection}";

/// Setup-time configuration failures
///
/// All of these abort a worker before any document is generated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("field spec [{spec}] for field '{field}' is malformed: {reason}")]
    InvalidFieldSpec {
        field: String,
        spec: String,
        reason: String,
    },

    #[error("unsupported dynamic field suffix '{suffix}' on field '{field}'")]
    UnsupportedFieldSuffix { field: String, suffix: String },

    #[error("percentage null must be between 0-100, field '{field}' gave {value}")]
    InvalidNullPercent { field: String, value: i64 },

    #[error("cardinality must be between 1 and {}, got {0}", i32::MAX)]
    InvalidCardinality(u64),

    #[error("{0} is required")]
    MissingParameter(String),

    #[error("endpoint type '{0}' not supported")]
    UnsupportedEndpoint(String),
}

/// Complete load-test configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub endpoint: EndpointConfig,
    #[serde(default)]
    pub workload: WorkloadConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub reporting: ReportingConfig,
    #[serde(default = "default_fields")]
    pub fields: Vec<FieldConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: EndpointConfig::default(),
            workload: WorkloadConfig::default(),
            retry: RetryConfig::default(),
            reporting: ReportingConfig::default(),
            fields: default_fields(),
        }
    }
}

impl Config {
    /// Parse every configured field into its immutable definition
    pub fn field_definitions(&self) -> Result<Vec<FieldDefinition>, ConfigError> {
        self.fields
            .iter()
            .map(|field| FieldDefinition::parse(&field.name, &field.spec, field.words))
            .collect()
    }
}

/// Where batches are sent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Backend flavour
    #[serde(rename = "type", default)]
    pub endpoint_type: EndpointType,
    /// Target collection
    #[serde(default = "default_collection")]
    pub collection: String,
    /// Base URLs of the cluster nodes (solrcloud only)
    #[serde(default)]
    pub solr_urls: Vec<String>,
    /// Ingestion pipeline URL (pipeline only); `${collection}` is substituted
    #[serde(default = "default_pipeline_url")]
    pub pipeline_url: String,
    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            endpoint_type: EndpointType::default(),
            collection: default_collection(),
            solr_urls: Vec::new(),
            pipeline_url: default_pipeline_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl EndpointConfig {
    /// Pipeline URL with the collection placeholder filled in
    pub fn resolved_pipeline_url(&self) -> String {
        self.pipeline_url.replace(COLLECTION_PLACEHOLDER, &self.collection)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn default_collection() -> String {
    "cloud".to_string()
}

fn default_pipeline_url() -> String {
    "http://localhost:8765/lucid/api/v1/index-pipelines/conn_logging/collections/${collection}/index"
        .to_string()
}

fn default_request_timeout_secs() -> u64 {
    60
}

/// Backend flavour
///
/// Parsed case-insensitively; `fusion` is accepted for `pipeline`. Any other
/// name fails with [`ConfigError::UnsupportedEndpoint`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum EndpointType {
    /// Clustered backend update API
    Solrcloud,
    /// HTTP ingestion pipeline taking a JSON array of documents
    Pipeline,
}

impl FromStr for EndpointType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "solrcloud" => Ok(Self::Solrcloud),
            "pipeline" | "fusion" => Ok(Self::Pipeline),
            _ => Err(ConfigError::UnsupportedEndpoint(s.to_string())),
        }
    }
}

impl TryFrom<String> for EndpointType {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl Default for EndpointType {
    fn default() -> Self {
        Self::Pipeline
    }
}

impl fmt::Display for EndpointType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Solrcloud => write!(f, "solrcloud"),
            Self::Pipeline => write!(f, "pipeline"),
        }
    }
}

/// Per-run workload shape
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkloadConfig {
    /// Number of parallel workers
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Documents per batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Documents each worker generates (raised to `batch_size` if smaller)
    #[serde(default = "default_docs_per_worker")]
    pub docs_per_worker: usize,
    /// Prefix of generated document ids
    #[serde(default = "default_id_prefix")]
    pub id_prefix: String,
    /// Base seed; worker N uses `random_seed + N`, the corpus shuffle uses it as-is
    #[serde(default = "default_random_seed")]
    pub random_seed: u64,
    /// Word list file
    #[serde(default = "default_word_list")]
    pub word_list: PathBuf,
    /// Issue a final commit when the last worker finishes
    #[serde(default = "default_true")]
    pub commit_at_end: bool,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            batch_size: default_batch_size(),
            docs_per_worker: default_docs_per_worker(),
            id_prefix: default_id_prefix(),
            random_seed: default_random_seed(),
            word_list: default_word_list(),
            commit_at_end: true,
        }
    }
}

impl WorkloadConfig {
    /// Documents per worker, never less than one full batch
    pub fn effective_docs_per_worker(&self) -> usize {
        self.docs_per_worker.max(self.batch_size)
    }
}

fn default_workers() -> usize {
    num_cpus::get()
}

fn default_batch_size() -> usize {
    100
}

fn default_docs_per_worker() -> usize {
    10_000
}

fn default_id_prefix() -> String {
    "id-".to_string()
}

fn default_random_seed() -> u64 {
    5150
}

fn default_word_list() -> PathBuf {
    PathBuf::from("100K_words_en.txt")
}

fn default_true() -> bool {
    true
}

/// Retry policy for transient transport failures
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Fixed wait between attempts
    #[serde(default = "default_wait_secs")]
    pub wait_secs: u64,
    /// Attempt budget for a batch hitting transient failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            wait_secs: default_wait_secs(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_wait_secs() -> u64 {
    10
}

fn default_max_retries() -> u32 {
    3
}

/// Periodic console report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportingConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
        }
    }
}

fn default_interval_secs() -> u64 {
    60
}

/// One output field as written in configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldConfig {
    /// Field name; the suffix after the last `_` picks the value kind
    pub name: String,
    /// `type:avgSize:cardinality:distribution:nullPercent`
    pub spec: String,
    /// Maximum words per value (free-text fields only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub words: Option<u32>,
}

impl FieldConfig {
    pub fn new(name: &str, spec: &str) -> Self {
        Self {
            name: name.to_string(),
            spec: spec.to_string(),
            words: None,
        }
    }

    pub fn text(name: &str, spec: &str, words: u32) -> Self {
        Self {
            name: name.to_string(),
            spec: spec.to_string(),
            words: Some(words),
        }
    }
}

/// The reference document schema
pub fn default_fields() -> Vec<FieldConfig> {
    vec![
        FieldConfig::new("integer1_i", "i:1:100000:u:10"),
        FieldConfig::new("integer2_i", "i:1:10000:u:50"),
        FieldConfig::new("long1_l", "l:1:10000000:u:10"),
        FieldConfig::new("long2_l", "l:1:50000000:u:20"),
        FieldConfig::new("float1_f", "f:1:2:u:10"),
        FieldConfig::new("float2_f", "f:1:1:u:10"),
        FieldConfig::new("double1_d", "d:1:6:u:20"),
        FieldConfig::new("double2_d", "d:1:4:u:40"),
        FieldConfig::new("timestamp1_tdt", "l:1:31536000:u:0"),
        FieldConfig::new("timestamp2_tdt", "l:1:31536000:u:10"),
        FieldConfig::new("string1_s", "s:10:20000:u:0"),
        FieldConfig::new("string2_s", "s:12:5000:u:0"),
        FieldConfig::new("string3_s", "s:4:1000:u:10"),
        FieldConfig::new("boolean1_b", "i:1:1:u:0"),
        FieldConfig::new("boolean2_b", "i:1:1:u:50"),
        FieldConfig::text("text1_en", "s:15:20000:z:0", 20),
        FieldConfig::text("text2_en", "s:20:100000:z:0", 30),
        FieldConfig::text("text3_en", "s:8:30000:z:0", 80),
    ]
}
