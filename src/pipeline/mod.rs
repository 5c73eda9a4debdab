//! Per-worker batching and transmission
//!
//! ```text
//! Idle -> Accumulating -> Flushing -> Accumulating -> ... -> Draining -> Done
//! ```
//!
//! Documents accumulate until the batch is full, then the batch is handed
//! to the sink. Transient transport failures are retried with a fixed wait
//! in a bounded loop; anything else fails the worker at once. A batch is
//! cleared only after the sink accepts it, so a failed batch is still
//! pending when the error reaches the caller.
//!
//! Each send attempt (retries included) is timed into the shared
//! `send_batch` timer, and the time spent filling each batch into
//! `construct_batch`.

use crate::config::RetryConfig;
use crate::document::Document;
use crate::sink::{DocumentSink, SinkError};
use crate::stats::MetricsRegistry;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{error, warn};

/// Where a pipeline is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Accumulating,
    Flushing,
    Draining,
    Done,
}

/// Fixed-wait retry policy for transient failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub wait: Duration,
    /// Total attempts for a batch hitting transient failures; 0 acts as 1
    pub max_retries: u32,
}

impl RetryPolicy {
    pub fn new(wait: Duration, max_retries: u32) -> Self {
        Self { wait, max_retries }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries.max(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(Duration::from_secs(config.wait_secs), config.max_retries)
    }
}

/// Send failure that ends a worker's run
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("batch send failed: {source}")]
    Fatal {
        #[source]
        source: SinkError,
    },

    #[error("batch send failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: SinkError,
    },
}

impl PipelineError {
    pub fn sink_error(&self) -> &SinkError {
        match self {
            Self::Fatal { source } | Self::RetriesExhausted { source, .. } => source,
        }
    }
}

/// Batches one worker's documents and sends them through a sink
pub struct BatchPipeline {
    label: String,
    sink: Arc<dyn DocumentSink>,
    metrics: Arc<MetricsRegistry>,
    retry: RetryPolicy,
    batch_size: usize,
    batch: Vec<Document>,
    batch_started: Option<Instant>,
    state: PipelineState,
    docs_sent: u64,
    batches_sent: u64,
}

impl BatchPipeline {
    /// `label` names the owning worker in log lines
    pub fn new(
        label: impl Into<String>,
        sink: Arc<dyn DocumentSink>,
        metrics: Arc<MetricsRegistry>,
        batch_size: usize,
        retry: RetryPolicy,
    ) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            label: label.into(),
            sink,
            metrics,
            retry,
            batch_size,
            batch: Vec::with_capacity(batch_size),
            batch_started: None,
            state: PipelineState::Idle,
            docs_sent: 0,
            batches_sent: 0,
        }
    }

    /// Add a document, sending the batch once it is full
    ///
    /// Returns the number of documents sent by this call: the batch size
    /// when it triggered a flush, otherwise 0.
    pub fn accumulate(&mut self, doc: Document) -> Result<usize, PipelineError> {
        if self.batch.is_empty() {
            self.batch_started = Some(Instant::now());
        }
        self.state = PipelineState::Accumulating;
        self.batch.push(doc);

        if self.batch.len() < self.batch_size {
            return Ok(0);
        }
        self.record_construct_time();
        self.flush()
    }

    /// Send whatever is pending
    ///
    /// Returns the number of documents sent. On error the batch stays
    /// pending.
    pub fn flush(&mut self) -> Result<usize, PipelineError> {
        if self.batch.is_empty() {
            return Ok(0);
        }
        if self.state != PipelineState::Draining {
            self.state = PipelineState::Flushing;
        }

        let max_attempts = self.retry.max_attempts();
        let mut attempt = 0;
        loop {
            attempt += 1;
            let started = Instant::now();
            let result = self.sink.send(&self.batch);
            self.metrics.record_send(started.elapsed());

            let err = match result {
                Ok(()) => break,
                Err(err) => err,
            };
            self.metrics.failures.add(1);

            if !err.is_transient() {
                error!("{}: failed to send batch of {} docs: {}", self.label, self.batch.len(), err);
                return Err(PipelineError::Fatal { source: err });
            }
            if attempt >= max_attempts {
                error!(
                    "{}: giving up on batch of {} docs after {} attempts: {}",
                    self.label,
                    self.batch.len(),
                    attempt,
                    err
                );
                return Err(PipelineError::RetriesExhausted {
                    attempts: attempt,
                    source: err,
                });
            }

            self.metrics.retries.add(1);
            warn!(
                "{}: {} sending batch, sleeping {} seconds before re-try",
                self.label,
                err,
                self.retry.wait.as_secs_f64()
            );
            if !self.retry.wait.is_zero() {
                thread::sleep(self.retry.wait);
            }
        }

        let sent = self.batch.len();
        self.batch.clear();
        self.docs_sent += sent as u64;
        self.batches_sent += 1;
        self.metrics.docs_sent.add(sent as u64);
        self.metrics.batches_sent.add(1);
        if self.state == PipelineState::Flushing {
            self.state = PipelineState::Accumulating;
        }
        Ok(sent)
    }

    /// Send the trailing partial batch and close the pipeline
    ///
    /// Returns the total number of documents this pipeline sent.
    pub fn finish(&mut self) -> Result<u64, PipelineError> {
        self.state = PipelineState::Draining;
        if !self.batch.is_empty() {
            self.record_construct_time();
            self.flush()?;
        }
        self.state = PipelineState::Done;
        Ok(self.docs_sent)
    }

    fn record_construct_time(&mut self) {
        if let Some(started) = self.batch_started.take() {
            self.metrics.record_construct(started.elapsed());
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Documents waiting in the current batch
    pub fn pending(&self) -> usize {
        self.batch.len()
    }

    pub fn docs_sent(&self) -> u64 {
        self.docs_sent
    }

    pub fn batches_sent(&self) -> u64 {
        self.batches_sent
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::mock::{MockFailure, MockSink};

    fn pipeline(sink: &MockSink, batch_size: usize, max_retries: u32) -> (BatchPipeline, Arc<MetricsRegistry>) {
        let metrics = Arc::new(MetricsRegistry::new());
        let pipeline = BatchPipeline::new(
            "test",
            Arc::new(sink.clone()),
            metrics.clone(),
            batch_size,
            RetryPolicy::new(Duration::ZERO, max_retries),
        );
        (pipeline, metrics)
    }

    fn fill(pipeline: &mut BatchPipeline, count: usize) -> Result<usize, PipelineError> {
        let mut sent = 0;
        for n in 0..count {
            sent += pipeline.accumulate(Document::with_id(format!("d{}", n)))?;
        }
        Ok(sent)
    }

    #[test]
    fn test_flushes_when_full() {
        let sink = MockSink::new();
        let (mut pipeline, metrics) = pipeline(&sink, 10, 3);
        assert_eq!(pipeline.state(), PipelineState::Idle);

        assert_eq!(fill(&mut pipeline, 9).unwrap(), 0);
        assert_eq!(pipeline.state(), PipelineState::Accumulating);
        assert_eq!(pipeline.pending(), 9);
        assert_eq!(sink.batch_count(), 0);

        assert_eq!(pipeline.accumulate(Document::with_id("d9")).unwrap(), 10);
        assert_eq!(pipeline.pending(), 0);
        assert_eq!(sink.batch_sizes(), vec![10]);
        assert_eq!(metrics.snapshot().construct_samples, 1);
    }

    #[test]
    fn test_finish_drains_partial_batch() {
        let sink = MockSink::new();
        let (mut pipeline, metrics) = pipeline(&sink, 100, 3);

        fill(&mut pipeline, 250).unwrap();
        assert_eq!(pipeline.finish().unwrap(), 250);
        assert_eq!(pipeline.state(), PipelineState::Done);
        assert_eq!(sink.batch_sizes(), vec![100, 100, 50]);
        assert_eq!(pipeline.batches_sent(), 3);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.docs_sent, 250);
        assert_eq!(snapshot.batches_sent, 3);
        assert_eq!(snapshot.construct_samples, 3);
    }

    #[test]
    fn test_finish_with_nothing_pending() {
        let sink = MockSink::new();
        let (mut pipeline, _) = pipeline(&sink, 5, 3);

        fill(&mut pipeline, 10).unwrap();
        assert_eq!(pipeline.finish().unwrap(), 10);
        assert_eq!(sink.batch_count(), 2);
    }

    #[test]
    fn test_transient_failures_below_budget_send_once() {
        for failures in 0..3 {
            let sink = MockSink::new();
            sink.push_failures(MockFailure::Transient, failures);
            let (mut pipeline, metrics) = pipeline(&sink, 10, 3);

            let sent = fill(&mut pipeline, 10).unwrap();
            assert_eq!(sent, 10);
            assert_eq!(pipeline.docs_sent(), 10);
            assert_eq!(sink.batch_count(), 1);
            assert_eq!(sink.send_attempts(), failures + 1);

            let snapshot = metrics.snapshot();
            assert_eq!(snapshot.retries, failures as u64);
            assert_eq!(snapshot.send_samples, failures as u64 + 1);
        }
    }

    #[test]
    fn test_transient_failures_at_budget_are_fatal() {
        let sink = MockSink::new();
        sink.push_failures(MockFailure::Transient, 3);
        let (mut pipeline, _) = pipeline(&sink, 10, 3);

        let err = fill(&mut pipeline, 10).unwrap_err();
        assert!(matches!(err, PipelineError::RetriesExhausted { attempts: 3, .. }));
        assert!(err.sink_error().is_transient());
        assert_eq!(sink.send_attempts(), 3);
        assert_eq!(sink.batch_count(), 0);
        // Batch is kept for the caller
        assert_eq!(pipeline.pending(), 10);
        assert_eq!(pipeline.docs_sent(), 0);
    }

    #[test]
    fn test_fatal_failure_not_retried() {
        let sink = MockSink::new();
        sink.push_failures(MockFailure::Fatal, 1);
        let (mut pipeline, metrics) = pipeline(&sink, 10, 3);

        let err = fill(&mut pipeline, 10).unwrap_err();
        assert!(matches!(err, PipelineError::Fatal { .. }));
        assert_eq!(sink.send_attempts(), 1);
        assert_eq!(pipeline.pending(), 10);
        assert_eq!(metrics.snapshot().retries, 0);
        assert_eq!(metrics.snapshot().failures, 1);
    }

    #[test]
    fn test_zero_retries_means_single_attempt() {
        let sink = MockSink::new();
        sink.push_failures(MockFailure::Transient, 1);
        let (mut pipeline, _) = pipeline(&sink, 1, 0);

        let err = pipeline.accumulate(Document::with_id("a")).unwrap_err();
        assert!(matches!(err, PipelineError::RetriesExhausted { attempts: 1, .. }));
        assert_eq!(sink.send_attempts(), 1);

        // Same batch goes out on the next flush
        assert_eq!(pipeline.flush().unwrap(), 1);
        assert_eq!(sink.sent_ids(), vec!["a"]);
    }

    #[test]
    fn test_retry_policy_from_config() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.wait, Duration::from_secs(10));
        assert_eq!(policy.max_retries, 3);
        assert_eq!(RetryPolicy::new(Duration::ZERO, 0).max_attempts(), 1);
    }
}
