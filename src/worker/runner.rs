//! Multi-worker load test harness
//!
//! Sets up the shared pieces (corpus, sink, metrics, reporter, completion
//! coordinator), attaches every worker before any of them starts, and runs
//! one OS thread per worker. Each thread detaches when its worker stops,
//! on success, failure or panic alike; the thread that detaches last sends
//! the final commit (if enabled) and stops the reporter.

use super::{Worker, WorkerReport};
use crate::config::Config;
use crate::coordinator::CompletionCoordinator;
use crate::corpus::WordCorpus;
use crate::field::FieldDefinition;
use crate::sink::{create_sink, DocumentSink};
use crate::stats::reporter::PeriodicReporter;
use crate::stats::{MetricsRegistry, MetricsSnapshot};
use crate::Result;
use anyhow::Context;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Result of a whole load test
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub workers: Vec<WorkerReport>,
    pub elapsed: Duration,
    /// Index of the worker that detached last and ran the final steps
    pub final_committer: Option<usize>,
    /// Whether a final commit was sent successfully
    pub committed: bool,
    pub commit_error: Option<String>,
    pub metrics: MetricsSnapshot,
}

impl RunSummary {
    pub fn total_docs_sent(&self) -> u64 {
        self.workers.iter().map(|report| report.docs_sent).sum()
    }

    pub fn failed_workers(&self) -> Vec<&WorkerReport> {
        self.workers.iter().filter(|report| !report.succeeded()).collect()
    }

    pub fn is_success(&self) -> bool {
        self.failed_workers().is_empty() && self.commit_error.is_none()
    }
}

/// What the last worker did on its way out
struct Finalization {
    worker: usize,
    committed: bool,
    commit_error: Option<String>,
}

/// Run a load test against the configured endpoint
pub fn run_load_test(config: Arc<Config>) -> Result<RunSummary> {
    let workload = &config.workload;
    let corpus = WordCorpus::shared(&workload.word_list, workload.random_seed)
        .context("Failed to load word list")?;

    let sink = create_sink(&config.endpoint).context("Failed to create sink")?;
    info!("Sending to {} endpoint, collection '{}'", sink.name(), config.endpoint.collection);

    run_with_sink(config, corpus, sink)
}

/// Run a load test with an already-built corpus and sink
pub fn run_with_sink(
    config: Arc<Config>,
    corpus: Arc<WordCorpus>,
    sink: Arc<dyn DocumentSink>,
) -> Result<RunSummary> {
    let definitions = config
        .field_definitions()
        .context("Invalid field configuration")?;
    warn_on_unreachable_words(&definitions, &corpus);

    let metrics = Arc::new(MetricsRegistry::new());
    let coordinator = Arc::new(CompletionCoordinator::new());

    // Every worker is built and attached before the first one starts, so an
    // early finisher can never see itself as last.
    let mut workers = Vec::with_capacity(config.workload.workers);
    for index in 0..config.workload.workers {
        let worker = Worker::new(index, &config, &definitions, &corpus, sink.clone(), metrics.clone())
            .with_context(|| format!("Failed to create worker {}", index))?;
        workers.push(worker);
    }
    for _ in &workers {
        coordinator.attach();
    }

    let reporter = Arc::new(PeriodicReporter::start(
        metrics.clone(),
        Duration::from_secs(config.reporting.interval_secs.max(1)),
    ));
    let commit_at_end = config.workload.commit_at_end;
    let started = Instant::now();

    let handles: Vec<_> = workers
        .into_iter()
        .map(|worker| {
            let coordinator = coordinator.clone();
            let sink = sink.clone();
            let reporter = reporter.clone();
            let index = worker.index();
            let thread_id = worker.thread_id().to_string();

            let handle = thread::spawn(move || {
                let report = panic::catch_unwind(AssertUnwindSafe(|| worker.execute()))
                    .unwrap_or_else(|_| panicked_report(index, &thread_id));

                let finalization = if coordinator.detach() {
                    Some(finalize(index, &thread_id, sink.as_ref(), &reporter, commit_at_end))
                } else {
                    None
                };
                (report, finalization)
            });
            (index, handle)
        })
        .collect();

    let mut reports = Vec::with_capacity(handles.len());
    let mut finalization = None;
    for (index, handle) in handles {
        let (report, finished) = handle
            .join()
            .map_err(|_| anyhow::anyhow!("Worker {} thread panicked", index))?;
        reports.push(report);
        if finished.is_some() {
            finalization = finished;
        }
    }
    let elapsed = started.elapsed();

    // Covers a run with zero workers; a no-op once the last worker stopped it
    reporter.stop();

    Ok(RunSummary {
        workers: reports,
        elapsed,
        final_committer: finalization.as_ref().map(|f| f.worker),
        committed: finalization.as_ref().map(|f| f.committed).unwrap_or(false),
        commit_error: finalization.and_then(|f| f.commit_error),
        metrics: metrics.snapshot(),
    })
}

fn finalize(
    index: usize,
    thread_id: &str,
    sink: &dyn DocumentSink,
    reporter: &PeriodicReporter,
    commit_at_end: bool,
) -> Finalization {
    let mut committed = false;
    let mut commit_error = None;

    if commit_at_end {
        info!("Thread {} is last, sending final commit to {}.", thread_id, sink.name());
        match sink.commit() {
            Ok(()) => committed = true,
            Err(err) => {
                error!("Failed to commit due to: {}", err);
                commit_error = Some(err.to_string());
            }
        }
    }

    reporter.stop();

    Finalization {
        worker: index,
        committed,
        commit_error,
    }
}

fn panicked_report(index: usize, thread_id: &str) -> WorkerReport {
    error!("Thread {} panicked", thread_id);
    WorkerReport {
        index,
        thread_id: thread_id.to_string(),
        docs_sent: 0,
        batches_sent: 0,
        elapsed: Duration::ZERO,
        error: Some("worker panicked".to_string()),
    }
}

/// Corpus-backed fields whose cardinality exceeds the corpus fall back to
/// folding ranks, which skews their distribution
fn warn_on_unreachable_words(definitions: &[FieldDefinition], corpus: &WordCorpus) {
    for definition in definitions {
        if definition.kind().uses_corpus() && definition.cardinality() as usize > corpus.len() {
            warn!(
                "Field {} has cardinality {} but the word list holds only {} words",
                definition.name(),
                definition.cardinality(),
                corpus.len()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FieldConfig;
    use crate::sink::mock::{MockFailure, MockSink};
    use std::collections::HashSet;

    fn corpus() -> Arc<WordCorpus> {
        Arc::new(WordCorpus::from_words((0..2000).map(|i| format!("word{}", i))).unwrap())
    }

    fn config(workers: usize, docs: usize, batch_size: usize) -> Config {
        let mut config = Config::default();
        config.workload.workers = workers;
        config.workload.docs_per_worker = docs;
        config.workload.batch_size = batch_size;
        config.retry.wait_secs = 0;
        config.reporting.interval_secs = 3600;
        config
    }

    #[test]
    fn test_three_workers_end_to_end() {
        let sink = MockSink::new();
        let summary =
            run_with_sink(Arc::new(config(3, 250, 100)), corpus(), Arc::new(sink.clone())).unwrap();

        assert!(summary.is_success());
        assert_eq!(summary.total_docs_sent(), 750);
        assert_eq!(sink.docs_sent(), 750);
        assert_eq!(summary.metrics.docs_sent, 750);
        assert_eq!(summary.metrics.batches_sent, 9);
        for report in &summary.workers {
            assert_eq!(report.docs_sent, 250);
            assert_eq!(report.batches_sent, 3);
        }

        let mut sizes = sink.batch_sizes();
        sizes.sort_unstable();
        assert_eq!(sizes, vec![50, 50, 50, 100, 100, 100, 100, 100, 100]);

        // Every id is unique across workers
        let ids: HashSet<String> = sink.sent_ids().into_iter().collect();
        assert_eq!(ids.len(), 750);
        assert!(ids.contains("id-_3_249"));

        assert_eq!(sink.commit_count(), 1);
        assert!(summary.committed);
        assert!(summary.final_committer.is_some());
    }

    #[test]
    fn test_no_commit_when_disabled() {
        let sink = MockSink::new();
        let mut config = config(2, 100, 50);
        config.workload.commit_at_end = false;

        let summary = run_with_sink(Arc::new(config), corpus(), Arc::new(sink.clone())).unwrap();
        assert_eq!(sink.commit_count(), 0);
        assert!(!summary.committed);
        assert!(summary.final_committer.is_some());
    }

    #[test]
    fn test_failed_workers_still_complete_protocol() {
        let sink = MockSink::new();
        sink.set_fail_always(Some(MockFailure::Fatal));

        let summary =
            run_with_sink(Arc::new(config(4, 100, 100)), corpus(), Arc::new(sink.clone())).unwrap();

        assert_eq!(summary.failed_workers().len(), 4);
        assert!(!summary.is_success());
        assert_eq!(summary.total_docs_sent(), 0);
        assert_eq!(sink.commit_count(), 1);
        assert!(summary.final_committer.is_some());
    }

    #[test]
    fn test_retries_absorb_transient_failures() {
        let sink = MockSink::new();
        sink.push_failures(MockFailure::Transient, 2);

        let summary =
            run_with_sink(Arc::new(config(1, 300, 100)), corpus(), Arc::new(sink.clone())).unwrap();

        assert!(summary.is_success());
        assert_eq!(summary.total_docs_sent(), 300);
        assert_eq!(summary.metrics.retries, 2);
        assert_eq!(sink.send_attempts(), 5);
    }

    #[test]
    fn test_invalid_field_rejected_before_start() {
        let sink = MockSink::new();
        let mut config = config(2, 100, 100);
        config.fields.push(FieldConfig::new("bogus_zz", "s:1:10:u:0"));

        assert!(run_with_sink(Arc::new(config), corpus(), Arc::new(sink.clone())).is_err());
        assert_eq!(sink.send_attempts(), 0);
        assert_eq!(sink.commit_count(), 0);
    }

    #[test]
    fn test_zero_workers() {
        let sink = MockSink::new();
        let summary =
            run_with_sink(Arc::new(config(0, 100, 100)), corpus(), Arc::new(sink.clone())).unwrap();
        assert!(summary.workers.is_empty());
        assert_eq!(summary.final_committer, None);
    }
}
