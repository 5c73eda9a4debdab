//! Worker implementation
//!
//! A worker generates its share of documents and pushes them through its own
//! batch pipeline. Everything it mutates is its own: the random source, the
//! field generators with their value caches and the pending batch. The only
//! shared pieces are read-only (corpus, configuration) or internally
//! synchronized (sink, metrics).
//!
//! # Lifecycle
//!
//! 1. **Creation**: `Worker::new()` seeds the context and instantiates the
//!    field set from the shared definitions
//! 2. **Execution**: `run()` builds `docs_per_worker` documents and sends
//!    them in batches, draining the last partial batch
//! 3. **Completion**: `execute()` wraps `run()` into a [`WorkerReport`]
//!
//! The multi-worker harness lives in [`runner`].

pub mod runner;

use crate::config::Config;
use crate::corpus::WordCorpus;
use crate::document::DocumentBuilder;
use crate::field::{instantiate_all, FieldDefinition};
use crate::pipeline::{BatchPipeline, PipelineError, RetryPolicy};
use crate::sink::DocumentSink;
use crate::stats::MetricsRegistry;
use crate::Result;
use anyhow::Context;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info};

/// Progress is logged each time this many more documents have been sent
pub const PROGRESS_LOG_INTERVAL: u64 = 1000;

/// Per-worker identity and random source
///
/// Worker numbers start at 1. The RNG is seeded with
/// `random_seed + worker_number`, so every worker draws its own
/// reproducible sequence.
pub struct WorkerContext {
    pub index: usize,
    pub thread_id: String,
    pub rng: Xoshiro256PlusPlus,
}

impl WorkerContext {
    pub fn new(index: usize, base_seed: u64) -> Self {
        let number = index as u64 + 1;
        Self {
            index,
            thread_id: number.to_string(),
            rng: Xoshiro256PlusPlus::seed_from_u64(base_seed.wrapping_add(number)),
        }
    }

    /// Id of the `seq`-th document of this worker
    pub fn doc_id(&self, prefix: &str, seq: usize) -> String {
        format!("{}_{}_{}", prefix, self.thread_id, seq)
    }
}

/// Outcome of one worker's run
#[derive(Debug, Clone)]
pub struct WorkerReport {
    pub index: usize,
    pub thread_id: String,
    pub docs_sent: u64,
    pub batches_sent: u64,
    pub elapsed: Duration,
    /// Error that ended the run early, if any
    pub error: Option<String>,
}

impl WorkerReport {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// One worker: document builder plus batch pipeline
pub struct Worker {
    ctx: WorkerContext,
    builder: DocumentBuilder,
    pipeline: BatchPipeline,
    id_prefix: String,
    docs_to_send: usize,
}

impl Worker {
    /// Create a worker
    ///
    /// # Errors
    ///
    /// Returns an error if a field generator cannot be built from its
    /// definition.
    pub fn new(
        index: usize,
        config: &Config,
        definitions: &[FieldDefinition],
        corpus: &Arc<WordCorpus>,
        sink: Arc<dyn DocumentSink>,
        metrics: Arc<MetricsRegistry>,
    ) -> Result<Self> {
        let workload = &config.workload;
        let ctx = WorkerContext::new(index, workload.random_seed);

        let fields = instantiate_all(definitions, corpus)
            .with_context(|| format!("Failed to set up fields for thread {}", ctx.thread_id))?;

        let pipeline = BatchPipeline::new(
            format!("Thread {}", ctx.thread_id),
            sink,
            metrics,
            workload.batch_size,
            RetryPolicy::from(&config.retry),
        );

        Ok(Self {
            ctx,
            builder: DocumentBuilder::new(fields),
            pipeline,
            id_prefix: workload.id_prefix.clone(),
            docs_to_send: workload.effective_docs_per_worker(),
        })
    }

    pub fn thread_id(&self) -> &str {
        &self.ctx.thread_id
    }

    pub fn index(&self) -> usize {
        self.ctx.index
    }

    /// Generate and send this worker's documents
    ///
    /// Returns the total number of documents sent. Stops at the first
    /// failed batch.
    pub fn run(&mut self) -> std::result::Result<u64, PipelineError> {
        info!(
            "Starting thread {}: batch_size={}, docs={}",
            self.ctx.thread_id,
            self.pipeline.batch_size(),
            self.docs_to_send
        );

        for seq in 0..self.docs_to_send {
            let id = self.ctx.doc_id(&self.id_prefix, seq);
            let doc = self.builder.build(&id, &mut self.ctx.rng);

            let sent = self.pipeline.accumulate(doc)?;
            if sent > 0 && self.pipeline.docs_sent() % PROGRESS_LOG_INTERVAL == 0 {
                info!(
                    "Thread {} has sent {} docs so far.",
                    self.ctx.thread_id,
                    self.pipeline.docs_sent()
                );
            }
        }

        self.pipeline.finish()
    }

    /// Run to completion or failure and report
    pub fn execute(mut self) -> WorkerReport {
        let started = Instant::now();
        let result = self.run();
        let elapsed = started.elapsed();

        let error = match result {
            Ok(total) => {
                info!("Thread {} finished sending {} docs.", self.ctx.thread_id, total);
                None
            }
            Err(err) => {
                error!(
                    "Thread {} failed after sending {} docs: {}",
                    self.ctx.thread_id,
                    self.pipeline.docs_sent(),
                    err
                );
                Some(err.to_string())
            }
        };

        WorkerReport {
            index: self.ctx.index,
            thread_id: self.ctx.thread_id.clone(),
            docs_sent: self.pipeline.docs_sent(),
            batches_sent: self.pipeline.batches_sent(),
            elapsed,
            error,
        }
    }
}
