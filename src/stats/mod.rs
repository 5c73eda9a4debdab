//! Throughput statistics
//!
//! Every worker records into one shared [`MetricsRegistry`] for the run:
//!
//! - **send_batch timer**: one sample per send attempt, retries included
//! - **construct_batch timer**: time spent generating documents for a batch
//! - **counters**: documents and batches sent, retries taken, failed sends
//!
//! Counters are lock-free atomics. The two timers sit behind their own
//! mutexes; they are touched once per batch, never per document, so the lock
//! is uncontended in practice.
//!
//! # Example
//!
//! ```
//! use indexpulse::stats::MetricsRegistry;
//! use std::time::Duration;
//!
//! let metrics = MetricsRegistry::new();
//! metrics.record_send(Duration::from_millis(20));
//! metrics.docs_sent.add(100);
//! metrics.batches_sent.add(1);
//!
//! let snapshot = metrics.snapshot();
//! assert_eq!(snapshot.docs_sent, 100);
//! assert_eq!(snapshot.send_samples, 1);
//! ```

pub mod histogram;
pub mod reporter;

use histogram::LatencyHistogram;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Cache-line aligned atomic counter to prevent false sharing
///
/// Workers on different cores bump these counters once per batch. Padding
/// each counter to 64 bytes keeps them on separate cache lines.
///
/// ```text
/// [value: 8 bytes][padding: 56 bytes] = 64 bytes total
/// ```
#[repr(align(64))]
#[derive(Debug)]
pub struct AlignedCounter {
    value: AtomicU64,
    _padding: [u8; 56],
}

impl AlignedCounter {
    pub fn new() -> Self {
        Self {
            value: AtomicU64::new(0),
            _padding: [0; 56],
        }
    }

    /// Uses `Ordering::Relaxed`; counters carry no cross-counter ordering.
    #[inline]
    pub fn add(&self, val: u64) {
        self.value.fetch_add(val, Ordering::Relaxed);
    }

    #[inline]
    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

impl Default for AlignedCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared timers and counters for one load-test run
#[derive(Debug)]
pub struct MetricsRegistry {
    send_batch: Mutex<LatencyHistogram>,
    construct_batch: Mutex<LatencyHistogram>,
    pub docs_sent: AlignedCounter,
    pub batches_sent: AlignedCounter,
    pub retries: AlignedCounter,
    pub failures: AlignedCounter,
    started: Instant,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self {
            send_batch: Mutex::new(LatencyHistogram::new()),
            construct_batch: Mutex::new(LatencyHistogram::new()),
            docs_sent: AlignedCounter::new(),
            batches_sent: AlignedCounter::new(),
            retries: AlignedCounter::new(),
            failures: AlignedCounter::new(),
            started: Instant::now(),
        }
    }

    /// Record the duration of one send attempt
    pub fn record_send(&self, elapsed: Duration) {
        lock(&self.send_batch).record(elapsed);
    }

    /// Record how long it took to fill one batch
    pub fn record_construct(&self, elapsed: Duration) {
        lock(&self.construct_batch).record(elapsed);
    }

    /// Time since the registry was created
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Point-in-time copy of every timer and counter
    pub fn snapshot(&self) -> MetricsSnapshot {
        let send = lock(&self.send_batch);
        let construct = lock(&self.construct_batch);

        MetricsSnapshot {
            elapsed: self.elapsed(),
            docs_sent: self.docs_sent.get(),
            batches_sent: self.batches_sent.get(),
            retries: self.retries.get(),
            failures: self.failures.get(),
            send_samples: send.len(),
            send_mean: send.mean(),
            send_p50: send.percentile(50.0),
            send_p99: send.percentile(99.0),
            send_max: send.max(),
            construct_samples: construct.len(),
            construct_mean: construct.mean(),
        }
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// A worker that panicked mid-record leaves a histogram that is still valid.
fn lock(histogram: &Mutex<LatencyHistogram>) -> MutexGuard<'_, LatencyHistogram> {
    histogram.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Copy of the registry at a point in time, used for reporting
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsSnapshot {
    pub elapsed: Duration,
    pub docs_sent: u64,
    pub batches_sent: u64,
    pub retries: u64,
    pub failures: u64,
    pub send_samples: u64,
    pub send_mean: Option<Duration>,
    pub send_p50: Option<Duration>,
    pub send_p99: Option<Duration>,
    pub send_max: Option<Duration>,
    pub construct_samples: u64,
    pub construct_mean: Option<Duration>,
}
