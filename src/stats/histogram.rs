//! Duration histogram using HdrHistogram
//!
//! Records how long batch sends and batch construction take. One histogram
//! per timer lives in the shared [`MetricsRegistry`](super::MetricsRegistry).
//!
//! # Example
//!
//! ```
//! use indexpulse::stats::histogram::LatencyHistogram;
//! use std::time::Duration;
//!
//! let mut hist = LatencyHistogram::new();
//! hist.record(Duration::from_millis(12));
//! hist.record(Duration::from_millis(40));
//!
//! assert_eq!(hist.len(), 2);
//! assert!(hist.percentile(50.0).is_some());
//! ```

use hdrhistogram::Histogram;
use std::time::Duration;

/// Longest duration tracked: 1 hour in nanoseconds. A single send with
/// retries is bounded well below that.
const MAX_TRACKABLE_NANOS: u64 = 3_600_000_000_000;

/// Duration histogram wrapper
///
/// Tracks durations from 1ns to 1 hour with 3 significant digits, so values
/// are accurate to within 0.1% and both recording and querying are O(1).
#[derive(Debug, Clone)]
pub struct LatencyHistogram {
    histogram: Histogram<u64>,
}

impl LatencyHistogram {
    /// Create an empty histogram
    pub fn new() -> Self {
        let histogram = Histogram::new_with_bounds(1, MAX_TRACKABLE_NANOS, 3)
            .expect("Failed to create histogram with valid bounds");

        Self { histogram }
    }

    /// Record one duration sample, clamped to the trackable range
    #[inline]
    pub fn record(&mut self, elapsed: Duration) {
        let nanos = elapsed.as_nanos().min(MAX_TRACKABLE_NANOS as u128) as u64;
        let _ = self.histogram.record(nanos.max(1));
    }

    /// Value at the given percentile (0.0 - 100.0), or None when empty
    pub fn percentile(&self, percentile: f64) -> Option<Duration> {
        if self.is_empty() {
            return None;
        }
        Some(Duration::from_nanos(self.histogram.value_at_percentile(percentile)))
    }

    pub fn min(&self) -> Option<Duration> {
        if self.is_empty() {
            return None;
        }
        Some(Duration::from_nanos(self.histogram.min()))
    }

    pub fn max(&self) -> Option<Duration> {
        if self.is_empty() {
            return None;
        }
        Some(Duration::from_nanos(self.histogram.max()))
    }

    pub fn mean(&self) -> Option<Duration> {
        if self.is_empty() {
            return None;
        }
        Some(Duration::from_nanos(self.histogram.mean() as u64))
    }

    /// Number of samples recorded
    pub fn len(&self) -> u64 {
        self.histogram.len()
    }

    pub fn is_empty(&self) -> bool {
        self.histogram.len() == 0
    }
}

impl Default for LatencyHistogram {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_histogram() {
        let hist = LatencyHistogram::new();
        assert_eq!(hist.len(), 0);
        assert!(hist.is_empty());
        assert!(hist.percentile(50.0).is_none());
        assert!(hist.mean().is_none());
    }

    #[test]
    fn test_percentile() {
        let mut hist = LatencyHistogram::new();
        for i in 1..=100 {
            hist.record(Duration::from_millis(i));
        }

        let p50 = hist.percentile(50.0).unwrap();
        let p99 = hist.percentile(99.0).unwrap();

        assert!(p50.as_millis() >= 49 && p50.as_millis() <= 51);
        assert!(p99.as_millis() >= 98 && p99.as_millis() <= 100);
    }

    #[test]
    fn test_min_max_mean() {
        let mut hist = LatencyHistogram::new();
        hist.record(Duration::from_millis(100));
        hist.record(Duration::from_millis(300));
        hist.record(Duration::from_millis(200));

        let min = hist.min().unwrap();
        let max = hist.max().unwrap();
        let mean = hist.mean().unwrap();

        assert!(min.as_millis() >= 99 && min.as_millis() <= 101);
        assert!(max.as_millis() >= 299 && max.as_millis() <= 301);
        assert!(mean.as_millis() >= 195 && mean.as_millis() <= 205);
    }

    #[test]
    fn test_zero_duration_is_clamped() {
        let mut hist = LatencyHistogram::new();
        hist.record(Duration::ZERO);
        assert_eq!(hist.len(), 1);
        assert_eq!(hist.min().unwrap(), Duration::from_nanos(1));
    }

    #[test]
    fn test_backoff_sized_samples() {
        // A send that sat through a 10s retry backoff must still land in range
        let mut hist = LatencyHistogram::new();
        hist.record(Duration::from_secs(31));
        let max = hist.max().unwrap();
        assert!(max.as_secs() >= 30 && max.as_secs() <= 32);
    }
}
