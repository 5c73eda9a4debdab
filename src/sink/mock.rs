//! Mock sink for testing
//!
//! Records every batch it accepts instead of sending it anywhere, and can
//! be scripted to fail. Clones share state, so a test can keep one handle
//! while the pipeline owns another.
//!
//! # Features
//!
//! - Queue of scripted failures consumed one per `send`
//! - Permanent failure mode
//! - Recorded batches (document ids) and attempt/commit counters
//!
//! # Example
//!
//! ```
//! use indexpulse::document::Document;
//! use indexpulse::sink::DocumentSink;
//! use indexpulse::sink::mock::{MockFailure, MockSink};
//!
//! let sink = MockSink::new();
//! sink.push_failures(MockFailure::Transient, 1);
//!
//! let batch = vec![Document::with_id("a")];
//! assert!(sink.send(&batch).is_err());
//! assert!(sink.send(&batch).is_ok());
//! assert_eq!(sink.sent_ids(), vec!["a"]);
//! assert_eq!(sink.send_attempts(), 2);
//! ```

use super::{DocumentSink, SinkError, TransportErrorKind};
use crate::document::Document;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Failure a mock `send` can be told to return
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    /// Retryable transport failure (connection refused)
    Transient,
    /// Backend rejection, never retried
    Fatal,
}

impl MockFailure {
    fn to_error(self) -> SinkError {
        match self {
            Self::Transient => {
                SinkError::transport(TransportErrorKind::ConnectionRefused, "mock connection refused")
            }
            Self::Fatal => SinkError::Rejected {
                status: 400,
                body: "mock rejection".to_string(),
            },
        }
    }
}

#[derive(Clone, Default)]
pub struct MockSink {
    /// Failures returned by the next sends, front first
    scripted: Arc<Mutex<VecDeque<MockFailure>>>,

    /// Failure returned by every send once the script is exhausted
    fail_always: Arc<Mutex<Option<MockFailure>>>,

    /// Start failing once this many batches have been accepted
    fail_after: Arc<Mutex<Option<(usize, MockFailure)>>>,

    /// Ids of every accepted batch, in arrival order
    batches: Arc<Mutex<Vec<Vec<String>>>>,

    send_attempts: Arc<AtomicUsize>,
    commits: Arc<AtomicUsize>,
}

impl MockSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` sends fail with `failure`
    pub fn push_failures(&self, failure: MockFailure, count: usize) {
        let mut scripted = self.scripted.lock().unwrap();
        scripted.extend(std::iter::repeat(failure).take(count));
    }

    /// Fail every send (after any scripted failures), or stop doing so
    pub fn set_fail_always(&self, failure: Option<MockFailure>) {
        *self.fail_always.lock().unwrap() = failure;
    }

    /// Accept `batches` batches, then fail every send with `failure`
    pub fn set_fail_after(&self, batches: usize, failure: MockFailure) {
        *self.fail_after.lock().unwrap() = Some((batches, failure));
    }

    /// Number of accepted batches
    pub fn batch_count(&self) -> usize {
        self.batches.lock().unwrap().len()
    }

    /// Size of every accepted batch, in arrival order
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batches.lock().unwrap().iter().map(Vec::len).collect()
    }

    /// Ids of every accepted document, in arrival order
    pub fn sent_ids(&self) -> Vec<String> {
        self.batches.lock().unwrap().iter().flatten().cloned().collect()
    }

    pub fn docs_sent(&self) -> usize {
        self.batches.lock().unwrap().iter().map(Vec::len).sum()
    }

    /// Calls to `send`, successful or not
    pub fn send_attempts(&self) -> usize {
        self.send_attempts.load(Ordering::SeqCst)
    }

    pub fn commit_count(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }
}

impl DocumentSink for MockSink {
    fn name(&self) -> &str {
        "mock"
    }

    fn send(&self, batch: &[Document]) -> Result<(), SinkError> {
        self.send_attempts.fetch_add(1, Ordering::SeqCst);

        let scripted = self.scripted.lock().unwrap().pop_front();
        if let Some(failure) = scripted.or(*self.fail_always.lock().unwrap()) {
            return Err(failure.to_error());
        }
        if let Some((limit, failure)) = *self.fail_after.lock().unwrap() {
            if self.batch_count() >= limit {
                return Err(failure.to_error());
            }
        }

        let ids = batch
            .iter()
            .map(|doc| doc.id().unwrap_or_default().to_string())
            .collect();
        self.batches.lock().unwrap().push(ids);
        Ok(())
    }

    fn commit(&self) -> Result<(), SinkError> {
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
