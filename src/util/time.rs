//! Timing and rate formatting helpers
//!
//! Used by the periodic reporter and the end-of-run summary to render send
//! latencies and document throughput.

use std::time::Duration;

/// Largest unit first; anything under a microsecond prints as whole nanos
const DURATION_UNITS: [(f64, &str); 3] = [(1e9, "s"), (1e6, "ms"), (1e3, "us")];

/// Metric prefixes for throughput, largest first
const RATE_PREFIXES: [(f64, &str); 3] = [(1e9, "G"), (1e6, "M"), (1e3, "K")];

/// Format a latency with two decimals in the largest fitting unit
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use indexpulse::util::time::format_duration;
///
/// assert_eq!(format_duration(Duration::from_nanos(500)), "500ns");
/// assert_eq!(format_duration(Duration::from_nanos(1500)), "1.50us");
/// assert_eq!(format_duration(Duration::from_micros(2500)), "2.50ms");
/// assert_eq!(format_duration(Duration::from_secs(5)), "5.00s");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let nanos = duration.as_nanos() as f64;
    DURATION_UNITS
        .iter()
        .find(|(scale, _)| nanos >= *scale)
        .map(|(scale, unit)| format!("{:.2}{}", nanos / scale, unit))
        .unwrap_or_else(|| format!("{}ns", duration.as_nanos()))
}

/// Format `count` over `elapsed` as a per-second rate with its unit
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use indexpulse::util::time::format_rate;
///
/// assert_eq!(format_rate(500, Duration::from_secs(1), "docs/s"), "500 docs/s");
/// assert_eq!(format_rate(3000, Duration::from_secs(2), "docs/s"), "1.50K docs/s");
/// assert_eq!(format_rate(10, Duration::ZERO, "batches/s"), "0 batches/s");
/// ```
pub fn format_rate(count: u64, elapsed: Duration, unit: &str) -> String {
    let rate = calculate_rate(count, elapsed);
    match RATE_PREFIXES.iter().find(|(scale, _)| rate >= *scale) {
        Some((scale, prefix)) => format!("{:.2}{} {}", rate / scale, prefix, unit),
        None => format!("{:.0} {}", rate, unit),
    }
}

/// Per-second rate of `count` events over `elapsed`; 0.0 for a zero duration
pub fn calculate_rate(count: u64, elapsed: Duration) -> f64 {
    let seconds = elapsed.as_secs_f64();
    if seconds > 0.0 {
        count as f64 / seconds
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration_units() {
        assert_eq!(format_duration(Duration::ZERO), "0ns");
        assert_eq!(format_duration(Duration::from_nanos(999)), "999ns");
        assert_eq!(format_duration(Duration::from_nanos(1000)), "1.00us");
        assert_eq!(format_duration(Duration::from_micros(1500)), "1.50ms");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
        assert_eq!(format_duration(Duration::from_secs(90)), "90.00s");
    }

    #[test]
    fn test_format_rate_prefixes() {
        let second = Duration::from_secs(1);
        assert_eq!(format_rate(999, second, "docs/s"), "999 docs/s");
        assert_eq!(format_rate(1_500, second, "docs/s"), "1.50K docs/s");
        assert_eq!(format_rate(2_500_000, second, "docs/s"), "2.50M docs/s");
        assert_eq!(format_rate(3_000_000_000, second, "docs/s"), "3.00G docs/s");
    }

    #[test]
    fn test_calculate_rate() {
        assert_eq!(calculate_rate(1000, Duration::from_secs(10)), 100.0);
        assert_eq!(calculate_rate(1000, Duration::ZERO), 0.0);
    }
}
