//! IndexPulse - synthetic document load generator for search backends
//!
//! IndexPulse generates randomized documents from a declarative field list
//! and pushes them in batches, from many parallel workers, to a document
//! ingestion endpoint. It is meant for load-testing indexing throughput.
//!
//! # Architecture
//!
//! - **Field generators**: typed values drawn from uniform or Zipf rank
//!   distributions over a fixed cardinality, backed by a shared word list
//! - **Batch pipeline**: per-worker accumulation with bounded retry of
//!   transient transport failures
//! - **Pluggable sinks**: clustered update API, HTTP ingestion pipeline
//! - **Completion tracking**: the last worker to stop sends the final commit
//! - **Metrics**: send latency histograms and periodic progress lines

pub mod config;
pub mod coordinator;
pub mod corpus;
pub mod distribution;
pub mod document;
pub mod field;
pub mod output;
pub mod pipeline;
pub mod sink;
pub mod stats;
pub mod util;
pub mod worker;

// Re-export commonly used types
pub use config::Config;
pub use corpus::WordCorpus;
pub use document::{Document, DocumentBuilder};
pub use field::{FieldDefinition, FieldSpec};
pub use sink::{DocumentSink, SinkError};

/// Result type used throughout IndexPulse
pub type Result<T> = anyhow::Result<T>;
