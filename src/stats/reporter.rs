//! Periodic throughput reporter
//!
//! One reporter runs per load test on a background thread and prints a
//! single line of throughput and send latency every interval. The worker
//! that finishes last stops it, which also prints one final report.
//!
//! # Example
//!
//! ```
//! use indexpulse::stats::MetricsRegistry;
//! use indexpulse::stats::reporter::PeriodicReporter;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let metrics = Arc::new(MetricsRegistry::new());
//! let reporter = PeriodicReporter::start(metrics.clone(), Duration::from_secs(60));
//! // ... workers record into `metrics` ...
//! assert!(reporter.stop());
//! assert!(!reporter.stop()); // second stop is a no-op
//! ```

use crate::output::text::format_report_line;
use crate::stats::MetricsRegistry;
use crossbeam::channel::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::warn;

/// Background reporter printing the shared metrics on a fixed interval
pub struct PeriodicReporter {
    metrics: Arc<MetricsRegistry>,
    state: Mutex<Option<ReporterThread>>,
}

struct ReporterThread {
    // Dropping the sender disconnects the channel and wakes the thread.
    stop_tx: Sender<()>,
    handle: JoinHandle<()>,
}

impl PeriodicReporter {
    /// Spawn the reporting thread
    pub fn start(metrics: Arc<MetricsRegistry>, interval: Duration) -> Self {
        let (stop_tx, stop_rx) = channel::bounded::<()>(1);
        let thread_metrics = metrics.clone();

        let handle = std::thread::spawn(move || loop {
            match stop_rx.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => {
                    println!("{}", format_report_line(&thread_metrics.snapshot()));
                }
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        });

        Self {
            metrics,
            state: Mutex::new(Some(ReporterThread { stop_tx, handle })),
        }
    }

    /// Stop the thread and print a final report
    ///
    /// Returns true for the call that actually stopped the reporter; later
    /// calls do nothing and return false.
    pub fn stop(&self) -> bool {
        if !self.shutdown() {
            return false;
        }
        println!("{}", format_report_line(&self.metrics.snapshot()));
        true
    }

    /// Whether the background thread is still running
    #[cfg(test)]
    fn is_running(&self) -> bool {
        self.state
            .lock()
            .map(|state| state.is_some())
            .unwrap_or(false)
    }

    fn shutdown(&self) -> bool {
        let taken = match self.state.lock() {
            Ok(mut state) => state.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };

        let Some(ReporterThread { stop_tx, handle }) = taken else {
            return false;
        };
        drop(stop_tx);
        if handle.join().is_err() {
            warn!("Reporter thread panicked");
        }
        true
    }
}

impl Drop for PeriodicReporter {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_is_idempotent() {
        let metrics = Arc::new(MetricsRegistry::new());
        let reporter = PeriodicReporter::start(metrics, Duration::from_secs(3600));
        assert!(reporter.is_running());

        assert!(reporter.stop());
        assert!(!reporter.is_running());
        assert!(!reporter.stop());
    }

    #[test]
    fn test_stop_does_not_wait_for_interval() {
        let metrics = Arc::new(MetricsRegistry::new());
        let reporter = PeriodicReporter::start(metrics, Duration::from_secs(3600));

        let started = std::time::Instant::now();
        reporter.stop();
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_reports_while_running() {
        let metrics = Arc::new(MetricsRegistry::new());
        metrics.docs_sent.add(10);
        let reporter = PeriodicReporter::start(metrics, Duration::from_millis(5));
        std::thread::sleep(Duration::from_millis(30));
        assert!(reporter.is_running());
        assert!(reporter.stop());
    }

    #[test]
    fn test_drop_stops_thread() {
        let metrics = Arc::new(MetricsRegistry::new());
        let reporter = PeriodicReporter::start(metrics, Duration::from_secs(3600));
        drop(reporter);
    }
}
